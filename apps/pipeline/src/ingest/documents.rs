//! Document ingestion: PDF → cleaned metadata → `documents` table → semantic index.
//!
//! Each file is a unit of work keyed by its file name. The document row and the file's index
//! chunks are both replaced on re-ingestion, so a file that failed halfway can be retried
//! without duplicating anything. A failed file stays in `to_process/` and the run moves on;
//! a processed file is moved to `processed/`. A PDF without a text layer is processed
//! normally: nothing is stored for it and it is moved along.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Paths;
use crate::errors::{Disposition, PipelineError};
use crate::extraction::StructuredExtractor;
use crate::ingest::pdf::{is_pdf, DocumentExtractor};
use crate::models::document::DocumentMetadata;
use crate::retrieval::chunking::{split_document, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::retrieval::index::{IndexDocument, SemanticIndex};
use crate::store::DocumentStore;

#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub ingested: Vec<String>,
    /// Processed files that had no extractable text.
    pub empty: Vec<String>,
    pub chunks: usize,
    /// `(file name, reason)` for every file left unprocessed.
    pub failed: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Ingested { chunks: usize },
    Empty,
}

pub struct DocumentIngestor {
    extractor: Arc<dyn DocumentExtractor>,
    structured: StructuredExtractor,
    store: Arc<dyn DocumentStore>,
    index: Arc<dyn SemanticIndex>,
}

impl DocumentIngestor {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        structured: StructuredExtractor,
        store: Arc<dyn DocumentStore>,
        index: Arc<dyn SemanticIndex>,
    ) -> Self {
        Self {
            extractor,
            structured,
            store,
            index,
        }
    }

    /// Ingests every PDF in `to_process/`, in file name order.
    pub async fn ingest_pending(&self, paths: &Paths) -> Result<IngestReport, PipelineError> {
        let files = pending_files(&paths.to_process_dir)?;
        info!(
            "Ingesting {} documents from {}",
            files.len(),
            paths.to_process_dir.display()
        );

        let mut report = IngestReport::default();
        for file in files {
            let name = file_name(&file);
            match self.ingest_file(&file, &name, &paths.processed_dir).await {
                Ok(FileOutcome::Ingested { chunks }) => {
                    report.chunks += chunks;
                    report.ingested.push(name);
                }
                Ok(FileOutcome::Empty) => report.empty.push(name),
                Err(e) => match e.disposition() {
                    Disposition::Fatal => return Err(e),
                    Disposition::SkipItem => {
                        warn!("Skipping {}: {}", name, e);
                        report.failed.push((name, e.to_string()));
                    }
                    Disposition::AbortJob => {
                        error!("Failed to ingest {}: {}", name, e);
                        report.failed.push((name, e.to_string()));
                    }
                },
            }
        }

        info!(
            "Ingestion finished: {} stored, {} without text, {} chunks indexed, {} failed",
            report.ingested.len(),
            report.empty.len(),
            report.chunks,
            report.failed.len()
        );
        Ok(report)
    }

    async fn ingest_file(
        &self,
        file: &Path,
        source: &str,
        processed_dir: &Path,
    ) -> Result<FileOutcome, PipelineError> {
        let text = self.extractor.extract_text(file).await?;
        if text.trim().is_empty() {
            info!("{} has no extractable text; nothing to store", source);
            move_to(file, processed_dir)?;
            return Ok(FileOutcome::Empty);
        }

        let metadata = self
            .structured
            .extract::<DocumentMetadata>(&text)
            .await?
            .with_measured_size();
        self.store.upsert_document(source, &metadata).await?;

        let chunks: Vec<IndexDocument> =
            split_document(&metadata.content, DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
                .into_iter()
                .map(|content| IndexDocument {
                    title: metadata.title.clone(),
                    category: metadata.category.clone(),
                    content,
                })
                .collect();
        let indexed = self.index.add(source, &chunks).await?;

        move_to(file, processed_dir)?;
        info!(
            "Ingested '{}' ({}, {} words, {} chunks)",
            metadata.title, metadata.category, metadata.size, indexed
        );
        Ok(FileOutcome::Ingested { chunks: indexed })
    }
}

fn pending_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !dir.exists() {
        warn!("{} does not exist; nothing to ingest", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_pdf(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn move_to(file: &Path, dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(file.file_name().unwrap_or(file.as_os_str()));
    std::fs::rename(file, &target)?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingIndex, MemoryDocumentStore, MemoryIndex, ScriptedModel, StaticExtractor,
    };

    fn paths(root: &Path) -> Paths {
        Paths {
            files_dir: root.join("files"),
            to_process_dir: root.join("to_process"),
            processed_dir: root.join("processed"),
        }
    }

    fn metadata_json(title: &str) -> String {
        serde_json::json!({
            "title": title,
            "content": "Led a platform team of twelve engineers. Introduced Python tooling.",
            "category": "cv",
            "size": 1
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_ingests_pdf_and_moves_it() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths(root.path());
        std::fs::create_dir_all(&paths.to_process_dir).unwrap();
        std::fs::write(paths.to_process_dir.join("cv.pdf"), b"%PDF").unwrap();
        std::fs::write(paths.to_process_dir.join("notes.txt"), b"ignored").unwrap();

        let response = metadata_json("Curriculum Vitae");
        let model = Arc::new(ScriptedModel::new(vec![response.as_str()]));
        let store = Arc::new(MemoryDocumentStore::default());
        let index = Arc::new(MemoryIndex::default());
        let ingestor = DocumentIngestor::new(
            Arc::new(StaticExtractor::new("raw  cv  text")),
            StructuredExtractor::new(model, 0),
            store.clone(),
            index.clone(),
        );

        let report = ingestor.ingest_pending(&paths).await.unwrap();

        assert_eq!(report.ingested, vec!["cv.pdf"]);
        assert!(report.failed.is_empty());
        assert_eq!(report.chunks, 1);
        assert!(paths.processed_dir.join("cv.pdf").exists());
        assert!(!paths.to_process_dir.join("cv.pdf").exists());
        assert!(paths.to_process_dir.join("notes.txt").exists());

        let stored = store.all_documents().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].size, 10);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_pdf_is_processed_without_storing() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths(root.path());
        std::fs::create_dir_all(&paths.to_process_dir).unwrap();
        std::fs::write(paths.to_process_dir.join("scan.pdf"), b"%PDF").unwrap();

        let model = Arc::new(ScriptedModel::new(vec![]));
        let store = Arc::new(MemoryDocumentStore::default());
        let index = Arc::new(MemoryIndex::default());
        let ingestor = DocumentIngestor::new(
            Arc::new(StaticExtractor::new("  \n")),
            StructuredExtractor::new(model.clone(), 0),
            store.clone(),
            index.clone(),
        );

        let report = ingestor.ingest_pending(&paths).await.unwrap();

        assert!(report.ingested.is_empty());
        assert_eq!(report.empty, vec!["scan.pdf"]);
        assert!(report.failed.is_empty());
        assert_eq!(model.call_count(), 0);
        assert!(paths.processed_dir.join("scan.pdf").exists());
        assert!(!paths.to_process_dir.join("scan.pdf").exists());
        assert!(store.all_documents().await.unwrap().is_empty());
        assert_eq!(index.len(), 0);
    }

    #[tokio::test]
    async fn test_failed_indexing_retry_yields_one_document() {
        let root = tempfile::tempdir().unwrap();
        let paths = paths(root.path());
        std::fs::create_dir_all(&paths.to_process_dir).unwrap();
        std::fs::write(paths.to_process_dir.join("cv.pdf"), b"%PDF").unwrap();

        let store = Arc::new(MemoryDocumentStore::default());
        let failing = DocumentIngestor::new(
            Arc::new(StaticExtractor::new("Rust developer")),
            StructuredExtractor::new(Arc::new(ScriptedModel::new(vec![&metadata_json("CV")])), 0),
            store.clone(),
            Arc::new(FailingIndex),
        );

        let first = failing.ingest_pending(&paths).await.unwrap();

        assert!(first.ingested.is_empty());
        assert_eq!(first.failed.len(), 1);
        assert!(paths.to_process_dir.join("cv.pdf").exists());

        let index = Arc::new(MemoryIndex::default());
        let retry = DocumentIngestor::new(
            Arc::new(StaticExtractor::new("Rust developer")),
            StructuredExtractor::new(Arc::new(ScriptedModel::new(vec![&metadata_json("CV")])), 0),
            store.clone(),
            index.clone(),
        );

        let second = retry.ingest_pending(&paths).await.unwrap();

        assert_eq!(second.ingested, vec!["cv.pdf"]);
        assert!(second.failed.is_empty());
        assert_eq!(store.all_documents().await.unwrap().len(), 1);
        assert_eq!(index.len(), 1);
        assert!(paths.processed_dir.join("cv.pdf").exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_run() {
        let root = tempfile::tempdir().unwrap();
        let ingestor = DocumentIngestor::new(
            Arc::new(StaticExtractor::new("text")),
            StructuredExtractor::new(Arc::new(ScriptedModel::new(vec![])), 0),
            Arc::new(MemoryDocumentStore::default()),
            Arc::new(MemoryIndex::default()),
        );

        let report = ingestor.ingest_pending(&paths(root.path())).await.unwrap();

        assert!(report.ingested.is_empty());
        assert!(report.failed.is_empty());
    }
}
