// Candidate/job triage: coarse match scoring and the candidate profile it scores against.
// All LLM calls go through llm_client.

pub mod profile;
pub mod prompts;
pub mod scorer;
