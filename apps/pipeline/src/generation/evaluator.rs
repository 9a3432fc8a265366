//! Quality Evaluator: scores a cover letter draft against the job it answers.
//!
//! Nine dimensions, each in [0, 1] at three-decimal precision. The model reports per
//! dimension whether the job states a requirement at all; a dimension without one scores
//! exactly 1.0 regardless of what the model put in `score`.
//!
//! The composite `result` is a weighted geometric mean of the nine sub-scores. It is computed
//! here, never taken from the model, so it is a pure function of the sub-scores.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::extraction::with_schema_retries;
use crate::generation::prompts::{EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};
use crate::llm_client::{call_json, CallOptions, LanguageModel};

// ────────────────────────────────────────────────────────────────────────────
// Dimensions and weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Skill,
    NiceToHave,
    DirectExperience,
    TransferExperience,
    Education,
    Culture,
    SoftSkills,
    Certificates,
    GoalAlignment,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::Skill,
        Dimension::NiceToHave,
        Dimension::DirectExperience,
        Dimension::TransferExperience,
        Dimension::Education,
        Dimension::Culture,
        Dimension::SoftSkills,
        Dimension::Certificates,
        Dimension::GoalAlignment,
    ];

    /// Weight in the composite. Weights sum to 1.0.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Skill => 0.20,
            Dimension::NiceToHave => 0.05,
            Dimension::DirectExperience => 0.20,
            Dimension::TransferExperience => 0.10,
            Dimension::Education => 0.10,
            Dimension::Culture => 0.08,
            Dimension::SoftSkills => 0.10,
            Dimension::Certificates => 0.05,
            Dimension::GoalAlignment => 0.12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Skill => "skill match",
            Dimension::NiceToHave => "nice-to-have match",
            Dimension::DirectExperience => "direct experience match",
            Dimension::TransferExperience => "transferable experience match",
            Dimension::Education => "education match",
            Dimension::Culture => "culture match",
            Dimension::SoftSkills => "soft skills match",
            Dimension::Certificates => "certificates match",
            Dimension::GoalAlignment => "goal alignment match",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Rounds to three decimal places.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// The nine sub-scores, indexed by `Dimension`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionScores([f64; 9]);

impl DimensionScores {
    /// Clamps each score into [0, 1] and rounds it to three decimals. NaN becomes 0.
    pub fn new(scores: [f64; 9]) -> Self {
        Self(scores.map(|s| if s.is_nan() { 0.0 } else { round3(s.clamp(0.0, 1.0)) }))
    }

    #[cfg(test)]
    pub fn uniform(score: f64) -> Self {
        Self::new([score; 9])
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        self.0[dimension.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.iter().map(move |d| (*d, self.get(*d)))
    }
}

impl Serialize for DimensionScores {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(9))?;
        for (dimension, score) in self.iter() {
            map.serialize_entry(&dimension, &score)?;
        }
        map.end()
    }
}

/// Weighted geometric mean of the sub-scores, rounded to three decimals.
/// Any zero sub-score makes the composite zero.
pub fn aggregate(scores: &DimensionScores) -> f64 {
    if scores.iter().any(|(_, s)| s <= 0.0) {
        return 0.0;
    }
    let log_sum: f64 = scores.iter().map(|(d, s)| d.weight() * s.ln()).sum();
    round3(log_sum.exp().clamp(0.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub scores: DimensionScores,
    pub result: f64,
}

impl EvaluationResult {
    pub fn from_scores(scores: DimensionScores) -> Self {
        Self {
            result: aggregate(&scores),
            scores,
        }
    }

    /// Dimensions below 1.0, lowest first. Ties keep declaration order.
    pub fn weakest(&self, n: usize) -> Vec<(Dimension, f64)> {
        let mut below: Vec<(Dimension, f64)> =
            self.scores.iter().filter(|(_, s)| *s < 1.0).collect();
        below.sort_by(|a, b| a.1.total_cmp(&b.1));
        below.truncate(n);
        below
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Evaluator trait + LLM implementation
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait QualityEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        draft_text: &str,
        job_description: &str,
    ) -> Result<EvaluationResult, PipelineError>;
}

#[derive(Debug, Deserialize)]
struct RawDimension {
    /// May be omitted only when `required` is false.
    #[serde(default)]
    score: Option<f64>,
    required: bool,
}

#[derive(Debug, Deserialize)]
struct RawEvaluation {
    skill_match: RawDimension,
    nice_to_have_match: RawDimension,
    direct_experience_match: RawDimension,
    transfer_experience_match: RawDimension,
    education_match: RawDimension,
    culture_match: RawDimension,
    soft_skills_match: RawDimension,
    certificates_match: RawDimension,
    goal_alignment_match: RawDimension,
}

impl RawEvaluation {
    /// Same order as `Dimension::ALL`.
    fn dimensions(&self) -> [&RawDimension; 9] {
        [
            &self.skill_match,
            &self.nice_to_have_match,
            &self.direct_experience_match,
            &self.transfer_experience_match,
            &self.education_match,
            &self.culture_match,
            &self.soft_skills_match,
            &self.certificates_match,
            &self.goal_alignment_match,
        ]
    }

    fn into_scores(self) -> Result<DimensionScores, PipelineError> {
        let mut scores = [0.0; 9];
        for (slot, (dimension, raw)) in scores
            .iter_mut()
            .zip(Dimension::ALL.iter().zip(self.dimensions()))
        {
            if !raw.required {
                *slot = 1.0;
                continue;
            }
            let score = raw.score.ok_or_else(|| {
                PipelineError::SchemaConformance(format!(
                    "{} is required but has no score",
                    dimension
                ))
            })?;
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(PipelineError::SchemaConformance(format!(
                    "{} score {} is outside [0, 1]",
                    dimension, score
                )));
            }
            *slot = score;
        }
        Ok(DimensionScores::new(scores))
    }
}

pub struct LlmQualityEvaluator {
    llm: Arc<dyn LanguageModel>,
    schema_retries: u32,
}

impl LlmQualityEvaluator {
    pub fn new(llm: Arc<dyn LanguageModel>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema_retries,
        }
    }
}

#[async_trait]
impl QualityEvaluator for LlmQualityEvaluator {
    async fn evaluate(
        &self,
        draft_text: &str,
        job_description: &str,
    ) -> Result<EvaluationResult, PipelineError> {
        if draft_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "cannot evaluate an empty cover letter draft".to_string(),
            ));
        }

        let prompt = EVALUATION_PROMPT_TEMPLATE
            .replace("{job_description}", job_description)
            .replace("{draft}", draft_text);
        let prompt = prompt.as_str();
        let llm = self.llm.as_ref();

        let scores = with_schema_retries("evaluation", self.schema_retries, move |_| async move {
            let (raw, _usage) = call_json::<RawEvaluation>(
                llm,
                prompt,
                EVALUATION_SYSTEM,
                CallOptions::json_exact(),
            )
            .await?;
            raw.into_scores()
        })
        .await?;

        let evaluation = EvaluationResult::from_scores(scores);
        for (dimension, score) in evaluation.scores.iter() {
            debug!("  {}: {:.3}", dimension, score);
        }
        info!("Draft evaluated: result={:.3}", evaluation.result);
        Ok(evaluation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;

    fn raw_json(score: f64, not_required: &[&str]) -> String {
        let keys = [
            "skill_match",
            "nice_to_have_match",
            "direct_experience_match",
            "transfer_experience_match",
            "education_match",
            "culture_match",
            "soft_skills_match",
            "certificates_match",
            "goal_alignment_match",
        ];
        let mut object = serde_json::Map::new();
        for key in keys {
            let required = !not_required.contains(&key);
            object.insert(
                key.to_string(),
                serde_json::json!({"score": score, "required": required}),
            );
        }
        serde_json::Value::Object(object).to_string()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_of_uniform_scores_is_that_score() {
        assert_eq!(aggregate(&DimensionScores::uniform(0.7)), 0.7);
        assert_eq!(aggregate(&DimensionScores::uniform(1.0)), 1.0);
    }

    #[test]
    fn test_aggregate_zero_dimension_is_zero() {
        let mut scores = [0.9; 9];
        scores[Dimension::Education.index()] = 0.0;
        assert_eq!(aggregate(&DimensionScores::new(scores)), 0.0);
    }

    #[test]
    fn test_aggregate_is_deterministic_and_bounded() {
        let scores = DimensionScores::new([0.91, 0.4, 0.77, 0.65, 1.0, 0.88, 0.72, 1.0, 0.59]);
        let first = aggregate(&scores);
        assert_eq!(first, aggregate(&scores));
        assert!((0.0..=1.0).contains(&first));
        // Weighted geometric mean never exceeds the weighted arithmetic mean.
        let arithmetic: f64 = scores.iter().map(|(d, s)| d.weight() * s).sum();
        assert!(first <= round3(arithmetic));
    }

    #[test]
    fn test_heavier_dimension_moves_result_more() {
        let mut skill_low = [0.9; 9];
        skill_low[Dimension::Skill.index()] = 0.5;
        let mut certs_low = [0.9; 9];
        certs_low[Dimension::Certificates.index()] = 0.5;
        assert!(
            aggregate(&DimensionScores::new(skill_low))
                < aggregate(&DimensionScores::new(certs_low))
        );
    }

    #[test]
    fn test_scores_are_clamped_and_rounded() {
        let scores = DimensionScores::new([1.4, -0.2, 0.12345, f64::NAN, 0.5, 0.5, 0.5, 0.5, 0.5]);
        assert_eq!(scores.get(Dimension::Skill), 1.0);
        assert_eq!(scores.get(Dimension::NiceToHave), 0.0);
        assert_eq!(scores.get(Dimension::DirectExperience), 0.123);
        assert_eq!(scores.get(Dimension::TransferExperience), 0.0);
    }

    #[test]
    fn test_weakest_skips_perfect_dimensions() {
        let scores = DimensionScores::new([1.0, 0.3, 1.0, 0.6, 1.0, 0.2, 1.0, 1.0, 1.0]);
        let weakest = EvaluationResult::from_scores(scores).weakest(2);
        assert_eq!(
            weakest,
            vec![(Dimension::Culture, 0.2), (Dimension::NiceToHave, 0.3)]
        );
    }

    #[tokio::test]
    async fn test_dimension_without_requirement_scores_exactly_one() {
        let response = raw_json(0.4, &["certificates_match", "education_match"]);
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let evaluator = LlmQualityEvaluator::new(model, 0);

        let evaluation = evaluator
            .evaluate("Dear hiring team, ...", "Backend engineer, Python")
            .await
            .unwrap();

        assert_eq!(evaluation.scores.get(Dimension::Certificates), 1.0);
        assert_eq!(evaluation.scores.get(Dimension::Education), 1.0);
        assert_eq!(evaluation.scores.get(Dimension::Skill), 0.4);
        assert_eq!(evaluation.result, aggregate(&evaluation.scores));
    }

    #[tokio::test]
    async fn test_every_sub_score_in_unit_interval() {
        let response = raw_json(0.83, &[]);
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let evaluator = LlmQualityEvaluator::new(model, 0);

        let evaluation = evaluator.evaluate("Letter", "Job").await.unwrap();

        assert!(evaluation.scores.iter().all(|(_, s)| (0.0..=1.0).contains(&s)));
        assert!((0.0..=1.0).contains(&evaluation.result));
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_retried() {
        let bad = raw_json(1.7, &[]);
        let good = raw_json(0.9, &[]);
        let model = Arc::new(ScriptedModel::new(vec![bad.as_str(), good.as_str()]));
        let evaluator = LlmQualityEvaluator::new(model.clone(), 1);

        let evaluation = evaluator.evaluate("Letter", "Job").await.unwrap();

        assert_eq!(evaluation.result, 0.9);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_required_dimension_without_score_is_retried() {
        let mut missing: serde_json::Value = serde_json::from_str(&raw_json(0.9, &[])).unwrap();
        missing["skill_match"] = serde_json::json!({"required": true});
        let missing = missing.to_string();
        let good = raw_json(0.9, &[]);
        let model = Arc::new(ScriptedModel::new(vec![missing.as_str(), good.as_str()]));
        let evaluator = LlmQualityEvaluator::new(model.clone(), 1);

        let evaluation = evaluator.evaluate("Letter", "Job").await.unwrap();

        assert_eq!(evaluation.scores.get(Dimension::Skill), 0.9);
        assert_eq!(evaluation.result, 0.9);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_required_dimension_without_score_fails_when_retries_spent() {
        let mut missing: serde_json::Value = serde_json::from_str(&raw_json(0.9, &[])).unwrap();
        missing["skill_match"] = serde_json::json!({"required": true});
        let model = Arc::new(ScriptedModel::repeating(&missing.to_string()));
        let evaluator = LlmQualityEvaluator::new(model, 0);

        let err = evaluator.evaluate("Letter", "Job").await.unwrap_err();

        assert!(err.is_schema_conformance());
    }

    #[tokio::test]
    async fn test_unrequired_dimension_may_omit_score() {
        let mut response: serde_json::Value = serde_json::from_str(&raw_json(0.8, &[])).unwrap();
        response["certificates_match"] = serde_json::json!({"required": false});
        let response = response.to_string();
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let evaluator = LlmQualityEvaluator::new(model, 0);

        let evaluation = evaluator.evaluate("Letter", "Job").await.unwrap();

        assert_eq!(evaluation.scores.get(Dimension::Certificates), 1.0);
    }

    #[tokio::test]
    async fn test_empty_draft_fails_fast() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let evaluator = LlmQualityEvaluator::new(model.clone(), 2);

        let err = evaluator.evaluate("  ", "Job").await.unwrap_err();

        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(model.call_count(), 0);
    }
}
