use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::PipelineError;

/// Text extraction from source documents.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Plain text of the document. A document without a text layer yields `""`.
    async fn extract_text(&self, path: &Path) -> Result<String, PipelineError>;
}

/// `pdf-extract` backed extractor. Parsing runs on the blocking pool.
pub struct PdfExtractor;

#[async_trait]
impl DocumentExtractor for PdfExtractor {
    async fn extract_text(&self, path: &Path) -> Result<String, PipelineError> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| PipelineError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}")))?
            .map_err(|e| {
                PipelineError::InvalidInput(format!("cannot read PDF {}: {e}", path.display()))
            })?;

        debug!("Extracted {} chars from {}", text.len(), path.display());
        Ok(text.trim().to_string())
    }
}

/// True for files with a `.pdf` extension, case-insensitive.
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}
