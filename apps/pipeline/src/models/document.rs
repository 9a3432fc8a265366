use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Cleaned text and metadata the model derives from one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub content: String,
    /// Kind of document, e.g. "certificate" or "cv".
    pub category: String,
    /// Word count of `content`.
    pub size: u32,
}

/// Row shape of the `documents` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub doc_id: i64,
    pub title: String,
    pub content: String,
    pub category: String,
    pub size: i32,
    pub created_on: DateTime<Utc>,
}

/// The `{title, content, category}` shape written to `documents.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedDocument {
    pub title: String,
    pub content: String,
    pub category: String,
}

impl From<&DocumentRow> for ExportedDocument {
    fn from(row: &DocumentRow) -> Self {
        Self {
            title: row.title.clone(),
            content: row.content.clone(),
            category: row.category.clone(),
        }
    }
}
