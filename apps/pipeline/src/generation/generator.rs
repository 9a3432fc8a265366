//! Letter Generation: drafts a seven-part cover letter from a structured job and evidence.
//!
//! The draft must be written in the language of the source job description. After each
//! model call the rendered letter is checked with `language::detect`; a mismatch is a
//! `SchemaConformance` failure and is retried within the schema retry bound.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::extraction::{blank_fields, render_schema, with_schema_retries, FieldSpec, RecordShape};
use crate::generation::evaluator::EvaluationResult;
use crate::generation::language::{self, Language};
use crate::generation::prompts::{
    FEEDBACK_TEMPLATE, GENERATION_PROMPT_TEMPLATE, GENERATION_SYSTEM, SAME_LANGUAGE_AS_JOB,
};
use crate::llm_client::prompts::NATURAL_TONE_INSTRUCTION;
use crate::llm_client::{call_json, CallOptions, LanguageModel};
use crate::models::job::StructuredJob;
use crate::retrieval::retriever::{Evidence, EvidenceCategory};

/// Number of weakest dimensions named in feedback.
const FEEDBACK_DIMENSIONS: usize = 3;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Measured cost of producing one draft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationMetadata {
    pub latency_ms: u64,
    pub token_count: u32,
}

/// One generated cover letter. Superseded by the next iteration's draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetterDraft {
    pub company: String,
    pub role: String,
    pub opener: String,
    pub body: String,
    pub bullet_points: String,
    pub motivation: String,
    pub closing: String,
    #[serde(skip_deserializing)]
    pub metadata: GenerationMetadata,
}

impl CoverLetterDraft {
    fn sections(&self) -> [(&'static str, &str); 7] {
        [
            ("company", self.company.as_str()),
            ("role", self.role.as_str()),
            ("opener", self.opener.as_str()),
            ("body", self.body.as_str()),
            ("bullet_points", self.bullet_points.as_str()),
            ("motivation", self.motivation.as_str()),
            ("closing", self.closing.as_str()),
        ]
    }

    /// The letter as sent: opener, body, bullet points, motivation and closing.
    /// Company and role are addressing metadata and are not part of the text.
    pub fn render(&self) -> String {
        [
            &self.opener,
            &self.body,
            &self.bullet_points,
            &self.motivation,
            &self.closing,
        ]
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
    }
}

impl RecordShape for CoverLetterDraft {
    const NAME: &'static str = "cover letter";
    const INSTRUCTIONS: &'static str = "";
    const FIELDS: &'static [FieldSpec] = &[
        FieldSpec::text("company", "the company's name"),
        FieldSpec::text("role", "the role the candidate is applying for"),
        FieldSpec::text(
            "opener",
            "opening statement; how the candidate heard about the job, or a generic statement",
        ),
        FieldSpec::text("body", "how the candidate fits the profile"),
        FieldSpec::text(
            "bullet_points",
            "quantifiable matches to the job description as bullet points, one per line",
        ),
        FieldSpec::text("motivation", "why the candidate wants to work for the company"),
        FieldSpec::text("closing", "closing statement and call to action"),
    ];

    fn conformance(&self) -> Result<(), String> {
        let blank = blank_fields(self.sections());
        if blank.is_empty() {
            Ok(())
        } else {
            Err(format!("empty sections: {}", blank.join(", ")))
        }
    }
}

/// Everything one generation call needs.
#[derive(Debug, Clone, Copy)]
pub struct LetterRequest<'a> {
    pub job: &'a StructuredJob,
    pub job_description: &'a str,
    pub evidence: &'a Evidence,
    /// The previous iteration's evaluation, if any.
    pub feedback: Option<&'a EvaluationResult>,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator trait + LLM implementation
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LetterGenerator: Send + Sync {
    async fn generate(&self, request: LetterRequest<'_>) -> Result<CoverLetterDraft, PipelineError>;
}

pub struct LlmLetterGenerator {
    llm: Arc<dyn LanguageModel>,
    schema_retries: u32,
}

impl LlmLetterGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema_retries,
        }
    }
}

#[async_trait]
impl LetterGenerator for LlmLetterGenerator {
    async fn generate(&self, request: LetterRequest<'_>) -> Result<CoverLetterDraft, PipelineError> {
        if request.job_description.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "job description cannot be empty when generating a cover letter".to_string(),
            ));
        }

        let expected = language::detect(request.job_description);
        debug!(
            "Job description language: {}",
            expected.map(Language::name).unwrap_or("undetermined")
        );

        let prompt = build_generation_prompt(&request, expected)?;
        let prompt = prompt.as_str();
        let llm = self.llm.as_ref();

        let draft = with_schema_retries("cover letter", self.schema_retries, move |_| async move {
            let started = Instant::now();
            let (mut draft, usage) = call_json::<CoverLetterDraft>(
                llm,
                prompt,
                GENERATION_SYSTEM,
                CallOptions::json_creative(),
            )
            .await?;

            draft
                .conformance()
                .map_err(|reason| PipelineError::SchemaConformance(format!("cover letter: {reason}")))?;
            check_language(expected, &draft.render())?;

            draft.metadata = GenerationMetadata {
                latency_ms: started.elapsed().as_millis() as u64,
                token_count: usage.total(),
            };
            Ok(draft)
        })
        .await?;

        info!(
            "Cover letter drafted for {} ({} ms, {} tokens)",
            draft.company, draft.metadata.latency_ms, draft.metadata.token_count
        );
        Ok(draft)
    }
}

/// Fails when the draft is confidently in a different language than expected.
fn check_language(expected: Option<Language>, draft_text: &str) -> Result<(), PipelineError> {
    match (expected, language::detect(draft_text)) {
        (Some(expected), Some(actual)) if expected != actual => {
            Err(PipelineError::SchemaConformance(format!(
                "cover letter written in {actual}, job description is in {expected}"
            )))
        }
        _ => Ok(()),
    }
}

fn build_generation_prompt(
    request: &LetterRequest<'_>,
    language: Option<Language>,
) -> Result<String, PipelineError> {
    let job_json = serde_json::to_string_pretty(request.job).map_err(|e| {
        PipelineError::Internal(anyhow::anyhow!("Failed to serialize StructuredJob: {e}"))
    })?;

    Ok(GENERATION_PROMPT_TEMPLATE
        .replace("{natural_tone_instruction}", NATURAL_TONE_INSTRUCTION)
        .replace("{language}", language.map(Language::name).unwrap_or(SAME_LANGUAGE_AS_JOB))
        .replace("{schema}", &render_schema(CoverLetterDraft::FIELDS))
        .replace("{job_json}", &job_json)
        .replace("{evidence}", &render_evidence(request.evidence))
        .replace("{feedback}", &render_feedback(request.feedback))
        .replace("{job_description}", request.job_description))
}

fn render_evidence(evidence: &Evidence) -> String {
    EvidenceCategory::ALL
        .iter()
        .map(|category| {
            let snippets = evidence.get(*category);
            let body = if snippets.is_empty() {
                "- (no matching evidence found)".to_string()
            } else {
                snippets
                    .iter()
                    .map(|s| format!("- {}", s.trim()))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            format!("[{}]\n{}", category, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_feedback(feedback: Option<&EvaluationResult>) -> String {
    let Some(evaluation) = feedback else {
        return String::new();
    };
    let weakest = evaluation
        .weakest(FEEDBACK_DIMENSIONS)
        .iter()
        .map(|(dimension, score)| format!("- {dimension}: {score:.3}"))
        .collect::<Vec<_>>()
        .join("\n");

    FEEDBACK_TEMPLATE
        .replace("{result}", &format!("{:.3}", evaluation.result))
        .replace("{weakest}", &weakest)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::evaluator::{Dimension, DimensionScores};
    use crate::testing::{draft_json, structured_job, ScriptedModel};

    const GERMAN_JOB: &str = "Wir suchen eine erfahrene Teamleitung für den Bereich IT. \
        Sie sind verantwortlich für die Planung und die Umsetzung von Projekten mit einem \
        Team von zehn Personen.";

    const ENGLISH_LETTER: &str = "I am writing to apply for the role. I have led the team \
        and delivered the platform with our partners in the region.";

    const GERMAN_LETTER: &str = "Ich bewerbe mich auf die Stelle. Ich habe ein Team von \
        zwölf Personen geleitet und die Einführung der Plattform mit den Partnern umgesetzt.";

    #[test]
    fn test_render_joins_letter_sections_in_order() {
        let draft: CoverLetterDraft = serde_json::from_str(&draft_json("Opening line.")).unwrap();
        let text = draft.render();
        let opener = text.find("Opening line.").unwrap();
        let closing = text.find(&draft.closing).unwrap();
        assert!(opener < closing);
        assert!(!text.contains(&draft.company));
    }

    #[test]
    fn test_blank_section_is_non_conforming() {
        let mut draft: CoverLetterDraft = serde_json::from_str(&draft_json("Hello.")).unwrap();
        draft.motivation = " ".to_string();
        let err = draft.conformance().unwrap_err();
        assert!(err.contains("motivation"));
    }

    #[tokio::test]
    async fn test_generate_records_metadata() {
        let response = draft_json(ENGLISH_LETTER);
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let generator = LlmLetterGenerator::new(model, 0);
        let job = structured_job();
        let evidence = Evidence::default();

        let draft = generator
            .generate(LetterRequest {
                job: &job,
                job_description: "We are hiring an engineering manager for the platform team.",
                evidence: &evidence,
                feedback: None,
            })
            .await
            .unwrap();

        assert!(draft.metadata.token_count > 0);
        assert_eq!(draft.opener, ENGLISH_LETTER);
    }

    #[tokio::test]
    async fn test_wrong_language_is_retried() {
        let english = draft_json(ENGLISH_LETTER);
        let german = draft_json(GERMAN_LETTER);
        let model = Arc::new(ScriptedModel::new(vec![english.as_str(), german.as_str()]));
        let generator = LlmLetterGenerator::new(model.clone(), 2);
        let job = structured_job();
        let evidence = Evidence::default();

        let draft = generator
            .generate(LetterRequest {
                job: &job,
                job_description: GERMAN_JOB,
                evidence: &evidence,
                feedback: None,
            })
            .await
            .unwrap();

        assert_eq!(draft.opener, GERMAN_LETTER);
        assert_eq!(model.call_count(), 2);
        assert!(model.prompts()[0].contains("Write every section in German."));
    }

    #[tokio::test]
    async fn test_language_mismatch_surfaces_after_retries() {
        let english = draft_json(ENGLISH_LETTER);
        let model = Arc::new(ScriptedModel::repeating(&english));
        let generator = LlmLetterGenerator::new(model.clone(), 1);
        let job = structured_job();
        let evidence = Evidence::default();

        let err = generator
            .generate(LetterRequest {
                job: &job,
                job_description: GERMAN_JOB,
                evidence: &evidence,
                feedback: None,
            })
            .await
            .unwrap_err();

        assert!(err.is_schema_conformance());
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_feedback_names_weakest_dimensions() {
        let response = draft_json(ENGLISH_LETTER);
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let generator = LlmLetterGenerator::new(model.clone(), 0);
        let job = structured_job();
        let evidence = Evidence::default();
        let mut scores = [1.0; 9];
        scores[Dimension::Culture as usize] = 0.41;
        let feedback = EvaluationResult::from_scores(DimensionScores::new(scores));

        generator
            .generate(LetterRequest {
                job: &job,
                job_description: "We are hiring an engineering manager for the platform team.",
                evidence: &evidence,
                feedback: Some(&feedback),
            })
            .await
            .unwrap();

        let prompt = model.prompts().pop().unwrap();
        assert!(prompt.contains("PREVIOUS DRAFT FEEDBACK"));
        assert!(prompt.contains("- culture match: 0.410"));
    }

    #[test]
    fn test_render_evidence_marks_empty_categories() {
        let rendered = render_evidence(&Evidence::default());
        assert!(rendered.contains("[requirements]"));
        assert!(rendered.contains("[nice-to-haves]"));
        assert!(rendered.contains("(no matching evidence found)"));
    }
}
