//! File artifacts: `documents.json` and plain-text letters and summaries.
//!
//! Writes go to a temp file in the target directory and are renamed into place, so a
//! crash never leaves a half-written artifact.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::errors::PipelineError;
use crate::models::document::ExportedDocument;
use crate::store::DocumentStore;

/// Writes `contents` to `path` atomically, creating the parent directory if needed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.flush()?;
    file.persist(path).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

/// Pretty-printed UTF-8 JSON array of `{title, content, category}`. Non-ASCII is kept as is.
pub fn write_documents_json(path: &Path, documents: &[ExportedDocument]) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(documents).map_err(|e| {
        PipelineError::Internal(anyhow::anyhow!("Failed to serialize documents: {e}"))
    })?;
    write_atomic(path, json.as_bytes())?;
    info!("Wrote {} documents to {}", documents.len(), path.display());
    Ok(())
}

pub fn write_text_artifact(path: &Path, text: &str) -> Result<(), PipelineError> {
    write_atomic(path, text.as_bytes())?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Exports every stored document to `path`.
pub async fn export_documents(
    store: &dyn DocumentStore,
    path: &Path,
) -> Result<Vec<ExportedDocument>, PipelineError> {
    let documents: Vec<ExportedDocument> = store
        .all_documents()
        .await?
        .iter()
        .map(ExportedDocument::from)
        .collect();
    write_documents_json(path, &documents)?;
    Ok(documents)
}
