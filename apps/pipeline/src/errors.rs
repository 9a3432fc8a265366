use thiserror::Error;

use crate::llm_client::LlmError;

/// Pipeline-level error type.
/// Every variant maps to a `Disposition` so batch loops can isolate failures per item.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Schema conformance error: {0}")]
    SchemaConformance(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Page load timed out: {url}")]
    PageLoadTimeout { url: String },

    #[error("Element '{selector}' not found on {url}")]
    ElementNotFound { selector: String, url: String },

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// What a batch loop does with a failed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log at warn level and move on to the next item.
    SkipItem,
    /// The current job cannot finish; log at error level and move on.
    AbortJob,
    /// Stop the whole run.
    Fatal,
}

impl PipelineError {
    pub fn disposition(&self) -> Disposition {
        match self {
            PipelineError::SchemaConformance(_)
            | PipelineError::InvalidInput(_)
            | PipelineError::PageLoadTimeout { .. }
            | PipelineError::ElementNotFound { .. }
            | PipelineError::Persistence(_)
            | PipelineError::Io(_) => Disposition::SkipItem,
            PipelineError::Connection(_)
            | PipelineError::Llm(_)
            | PipelineError::Internal(_) => Disposition::AbortJob,
            PipelineError::Config(_) | PipelineError::Cancelled => Disposition::Fatal,
        }
    }

    /// True for model output that did not match the requested record shape.
    pub fn is_schema_conformance(&self) -> bool {
        matches!(self, PipelineError::SchemaConformance(_))
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Parse(e) => PipelineError::SchemaConformance(e.to_string()),
            LlmError::EmptyContent => {
                PipelineError::SchemaConformance("model returned empty content".to_string())
            }
            LlmError::Http(e) if e.is_connect() || e.is_timeout() => {
                PipelineError::Connection(e.to_string())
            }
            other => PipelineError::Llm(other.to_string()),
        }
    }
}
