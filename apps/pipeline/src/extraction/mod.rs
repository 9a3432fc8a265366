//! Structured Extraction: turns free text into a typed record via one model call.
//!
//! A record type describes itself through `RecordShape`: field names, kinds and
//! natural-language descriptions. The prompt is rendered from that description and the
//! response must deserialize into the type and pass its conformance check, otherwise the
//! call fails with `SchemaConformance` and is retried a bounded number of times.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::PipelineError;
use crate::extraction::prompts::{EXTRACTION_PROMPT_TEMPLATE, EXTRACTION_SYSTEM};
use crate::llm_client::{call_json, CallOptions, LanguageModel};

pub mod document;
pub mod job;
pub mod prompts;

// ────────────────────────────────────────────────────────────────────────────
// Schema description
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// One declared field of a record shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            description,
        }
    }

    pub const fn integer(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            description,
        }
    }
}

/// A record type the extraction service can produce.
pub trait RecordShape: DeserializeOwned + Send {
    /// Human-readable record name used in prompts and logs.
    const NAME: &'static str;
    /// Extra task instructions placed before the schema.
    const INSTRUCTIONS: &'static str;
    const FIELDS: &'static [FieldSpec];

    /// Checks constraints serde cannot express. `Err` carries the reason.
    fn conformance(&self) -> Result<(), String>;
}

/// Renders the JSON skeleton shown to the model.
pub fn render_schema(fields: &[FieldSpec]) -> String {
    let lines: Vec<String> = fields
        .iter()
        .map(|f| {
            let kind = match f.kind {
                FieldKind::Text => "string",
                FieldKind::Integer => "integer",
            };
            format!("  \"{}\": <{}: {}>", f.name, kind, f.description)
        })
        .collect();
    format!("{{\n{}\n}}", lines.join(",\n"))
}

// ────────────────────────────────────────────────────────────────────────────
// Bounded retry on malformed output
// ────────────────────────────────────────────────────────────────────────────

/// Runs `attempt` until it succeeds, fails with a non-schema error, or `retries`
/// extra attempts have been spent on `SchemaConformance` failures.
pub async fn with_schema_retries<T, F, Fut>(
    label: &str,
    retries: u32,
    mut attempt: F,
) -> Result<T, PipelineError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut n = 0;
    loop {
        match attempt(n).await {
            Err(e) if e.is_schema_conformance() && n < retries => {
                warn!(
                    "{} attempt {}/{} returned a non-conforming record: {}",
                    label,
                    n + 1,
                    retries + 1,
                    e
                );
                n += 1;
            }
            other => return other,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct StructuredExtractor {
    llm: Arc<dyn LanguageModel>,
    schema_retries: u32,
}

impl StructuredExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema_retries,
        }
    }

    /// Extracts a `T` from `text`.
    ///
    /// Empty text fails fast with `InvalidInput` and never reaches the model.
    pub async fn extract<T: RecordShape>(&self, text: &str) -> Result<T, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "cannot extract {} from empty text",
                T::NAME
            )));
        }

        let prompt = build_extraction_prompt::<T>(text);
        let prompt = prompt.as_str();
        let llm = self.llm.as_ref();

        with_schema_retries(T::NAME, self.schema_retries, move |_| async move {
            let (record, _usage) = call_json::<T>(
                llm,
                prompt,
                EXTRACTION_SYSTEM,
                CallOptions::json_exact(),
            )
            .await?;

            record.conformance().map_err(|reason| {
                PipelineError::SchemaConformance(format!("{}: {reason}", T::NAME))
            })?;

            debug!("Extracted {} record", T::NAME);
            Ok(record)
        })
        .await
    }
}

fn build_extraction_prompt<T: RecordShape>(text: &str) -> String {
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{record_name}", T::NAME)
        .replace("{instructions}", T::INSTRUCTIONS)
        .replace("{schema}", &render_schema(T::FIELDS))
        .replace("{text}", text)
}

/// Returns the names of fields that are blank.
pub(crate) fn blank_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Vec<&'a str> {
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}
