// Cover letter generation: drafting, quality evaluation and the refinement loop.
// All LLM calls go through llm_client.

pub mod evaluator;
pub mod generator;
pub mod language;
pub mod prompts;
pub mod refinement;
