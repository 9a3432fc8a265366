//! Persistence seams for jobs and candidate documents.
//!
//! `PgStore` is the production backend. Each unit of work runs in its own transaction;
//! a dropped transaction rolls back.

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::models::document::{DocumentMetadata, DocumentRow};
use crate::models::job::{JobStatus, NewJobRecord, PersistedJobRecord};

pub mod postgres;

pub use postgres::PgStore;

/// Result of an insert that respects url uniqueness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted { id: i64 },
    Duplicate,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn exists(&self, url: &str) -> Result<bool, PipelineError>;

    /// Existence check and insert in one transaction. At most one record per url.
    async fn insert_if_absent(&self, record: &NewJobRecord)
        -> Result<InsertOutcome, PipelineError>;

    /// All records, newest first, optionally filtered by status.
    async fn select_all(
        &self,
        status: Option<JobStatus>,
    ) -> Result<Vec<PersistedJobRecord>, PipelineError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts the document ingested from `source`, replacing any earlier row for the same
    /// source so a re-ingested file never yields a second document.
    async fn upsert_document(
        &self,
        source: &str,
        document: &DocumentMetadata,
    ) -> Result<i64, PipelineError>;

    async fn all_documents(&self) -> Result<Vec<DocumentRow>, PipelineError>;
}
