//! Semantic index over candidate-document chunks.
//!
//! Writes (ingestion) and reads (retrieval) happen in separate pipeline phases; the index
//! does not coordinate concurrent ingest-during-query.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::errors::PipelineError;
use crate::retrieval::embedding::Embedder;
use crate::retrieval::similarity::top_k;

/// Collection name used for candidate evidence.
pub const EVIDENCE_COLLECTION: &str = "candidate_evidence";

/// A chunk of candidate text to index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub title: String,
    pub category: String,
    pub content: String,
}

#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Up to `k` snippets ordered by descending similarity to `query`.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, PipelineError>;

    /// Embeds and stores the chunks of `source`, replacing any chunks indexed for it before.
    /// Returns the number stored.
    async fn add(&self, source: &str, documents: &[IndexDocument]) -> Result<usize, PipelineError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres-backed index
// ────────────────────────────────────────────────────────────────────────────

/// Stores chunk vectors as `REAL[]` in `document_chunks` and ranks them in process.
pub struct PgSemanticIndex {
    pool: PgPool,
    embedder: Arc<dyn Embedder>,
    collection: String,
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    content: String,
    embedding: Vec<f32>,
}

impl PgSemanticIndex {
    pub fn new(pool: PgPool, embedder: Arc<dyn Embedder>, collection: impl Into<String>) -> Self {
        Self {
            pool,
            embedder,
            collection: collection.into(),
        }
    }
}

#[async_trait]
impl SemanticIndex for PgSemanticIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, PipelineError> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT content, embedding FROM document_chunks \
             WHERE collection = $1 AND embedder = $2 ORDER BY id",
        )
        .bind(&self.collection)
        .bind(self.embedder.name())
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .pop()
            .unwrap_or_default();

        let (contents, vectors): (Vec<String>, Vec<Vec<f32>>) =
            rows.into_iter().map(|r| (r.content, r.embedding)).unzip();

        let hits: Vec<String> = top_k(&query_vector, &vectors, k)
            .into_iter()
            .map(|i| contents[i].clone())
            .collect();

        debug!("Semantic search '{}' returned {} snippets", query, hits.len());
        Ok(hits)
    }

    async fn add(&self, source: &str, documents: &[IndexDocument]) -> Result<usize, PipelineError> {
        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed(&texts).await?
        };

        let mut tx = self.pool.begin().await?;
        let replaced = sqlx::query("DELETE FROM document_chunks WHERE collection = $1 AND source = $2")
            .bind(&self.collection)
            .bind(source)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if replaced > 0 {
            debug!("Replacing {} chunks previously indexed for {}", replaced, source);
        }

        for (doc, vector) in documents.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO document_chunks (collection, source, embedder, title, category, content, embedding)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&self.collection)
            .bind(source)
            .bind(self.embedder.name())
            .bind(&doc.title)
            .bind(&doc.category)
            .bind(&doc.content)
            .bind(vector)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            "Indexed {} chunks into collection '{}'",
            documents.len(),
            self.collection
        );
        Ok(documents.len())
    }
}
