// LLM prompt constants for structured extraction.

/// System prompt for extraction: deterministic, JSON-only output.
pub const EXTRACTION_SYSTEM: &str = "You are a meticulous information extraction engine. \
    You read unstructured text and fill a fixed record schema. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Extraction prompt template.
/// Replace: {record_name}, {instructions}, {schema}, {text}
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract a {record_name} record from the text below.

{instructions}

Return a JSON object with this EXACT schema (every field present, no extra fields):
{schema}

HARD RULES:
1. Every field MUST be present with the stated type
2. String fields MUST NOT be empty; use "Not specified" when the text does not mention it
3. Comma-separated lists MUST use plain commas between items, no bullets or numbering
4. Keep the language of the source text for free-text fields

TEXT:
{text}"#;

/// Placeholder the model writes for fields the text does not mention.
pub const NOT_SPECIFIED: &str = "Not specified";
