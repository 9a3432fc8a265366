// All LLM prompt constants for the matching module.

/// System prompt for match scoring: enforces JSON-only output.
pub const MATCH_SYSTEM: &str = "You are an experienced technical recruiter. \
    You compare a candidate profile with a job description and estimate how well they match. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Match scoring prompt template. Replace: {profile_summary}, {job_text}
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Evaluate how well the candidate profile matches the job description.
Consider hard skills, direct and transferable experience, education and soft skills.

Return a JSON object with this EXACT schema:
{"match": 72}

`match` is an integer percentage between 0 and 100.

CANDIDATE PROFILE:
{profile_summary}

JOB DESCRIPTION:
{job_text}"#;

/// System prompt for the profile summary: plain text output.
pub const PROFILE_SUMMARY_SYSTEM: &str = "You are a career advisor who writes concise, \
    factual candidate profiles for job applications. Respond with plain text only.";

/// Profile summary prompt template. Replace: {documents}
pub const PROFILE_SUMMARY_PROMPT_TEMPLATE: &str = r#"Using the documents below, write a comprehensive summary of the candidate's profile.
Highlight experience, skills, education, certificates and any other information relevant to a job application.
Only use facts stated in the documents.

DOCUMENTS:
{documents}"#;
