// Prompt fragments shared across services. Service-specific prompts live in each
// module's own prompts.rs.

/// Appended to prompts whose output is read by a hiring company.
pub const NATURAL_TONE_INSTRUCTION: &str = "\
    Write professionally and engagingly, without the stock phrasing typical of generated text. \
    Use only facts supported by the candidate evidence provided. Never invent employers, \
    degrees, certificates or metrics.";
