// All LLM prompt constants for the Generation module.
// The tone fragment comes from llm_client::prompts.

/// System prompt for letter generation. Enforces JSON-only output.
pub const GENERATION_SYSTEM: &str = "You are an experienced career coach who writes \
    tailored cover letters from verified candidate evidence. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Cover letter prompt template.
/// Replace: {natural_tone_instruction}, {language}, {schema}, {job_json},
///          {evidence}, {feedback}, {job_description}
pub const GENERATION_PROMPT_TEMPLATE: &str = r#"Write a cover letter with the goal of landing the job described below.

{natural_tone_instruction}

The letter must fit on one page and follow a professional format.
Write every section in {language}.

Return a JSON object with this EXACT schema (every field present and non-empty):
{schema}

STRUCTURED JOB:
{job_json}

CANDIDATE EVIDENCE (source of truth, retrieved per requirement category):
{evidence}
{feedback}
JOB DESCRIPTION:
{job_description}"#;

/// Feedback block added when a previous draft was evaluated.
/// Replace: {result}, {weakest}
pub const FEEDBACK_TEMPLATE: &str = r#"
PREVIOUS DRAFT FEEDBACK:
The previous draft scored {result} out of 1.0. Strengthen these weakest dimensions
with concrete, evidence-backed statements:
{weakest}
"#;

/// Used in place of a language name when the job text's language is undetermined.
pub const SAME_LANGUAGE_AS_JOB: &str = "the same language as the job description";

/// System prompt for letter evaluation. Deterministic, JSON-only output.
pub const EVALUATION_SYSTEM: &str = "You are a hiring manager at the company that posted \
    the job. You judge how strongly a cover letter supports the candidate's application. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Evaluation prompt template. Replace: {job_description}, {draft}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the cover letter below from the point of view of the company filling this job.

Score each dimension with a continuous value between 0 and 1, accurate to 3 decimal places.
For each dimension also report whether the job description states any requirement for it.
If it does not, set "required" to false.

Return a JSON object with this EXACT schema:
{
  "skill_match": {"score": 0.850, "required": true},
  "nice_to_have_match": {"score": 0.600, "required": true},
  "direct_experience_match": {"score": 0.700, "required": true},
  "transfer_experience_match": {"score": 0.800, "required": true},
  "education_match": {"score": 1.000, "required": false},
  "culture_match": {"score": 0.750, "required": true},
  "soft_skills_match": {"score": 0.800, "required": true},
  "certificates_match": {"score": 1.000, "required": false},
  "goal_alignment_match": {"score": 0.700, "required": true}
}

Dimensions:
- skill_match: required hard skills
- nice_to_have_match: preferred or optional skills
- direct_experience_match: experience in the same role or domain
- transfer_experience_match: experience from adjacent roles that carries over
- education_match: degrees and formal education
- culture_match: company values and working style
- soft_skills_match: communication, leadership, collaboration
- certificates_match: required certifications or licences
- goal_alignment_match: how the candidate's goals fit the role and company

JOB DESCRIPTION:
{job_description}

COVER LETTER:
{draft}"#;
