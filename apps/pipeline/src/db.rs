use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("database unreachable")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        doc_id      BIGSERIAL PRIMARY KEY,
        source      TEXT,
        title       TEXT NOT NULL,
        content     TEXT NOT NULL,
        category    TEXT NOT NULL,
        size        INTEGER NOT NULL,
        created_on  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id                BIGSERIAL PRIMARY KEY,
        job_title         TEXT NOT NULL,
        job_url           TEXT NOT NULL UNIQUE,
        company_name      TEXT NOT NULL,
        contact_person    TEXT NOT NULL,
        employment_type   TEXT NOT NULL,
        requirements      TEXT NOT NULL,
        nice_to_haves     TEXT NOT NULL,
        experience_level  TEXT NOT NULL,
        education_level   TEXT NOT NULL,
        compensation      TEXT NOT NULL,
        company_culture   TEXT NOT NULL,
        location          TEXT NOT NULL,
        company_size      TEXT NOT NULL,
        company_industry  TEXT NOT NULL,
        work_hours        TEXT NOT NULL,
        summary           TEXT NOT NULL,
        match_score       SMALLINT NOT NULL CHECK (match_score BETWEEN 0 AND 100),
        status            TEXT NOT NULL DEFAULT 'pending'
                          CHECK (status IN ('pending', 'approved', 'rejected')),
        applied           TIMESTAMPTZ,
        created_at        TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS document_chunks (
        id          BIGSERIAL PRIMARY KEY,
        collection  TEXT NOT NULL,
        source      TEXT NOT NULL DEFAULT '',
        embedder    TEXT NOT NULL,
        title       TEXT NOT NULL,
        category    TEXT NOT NULL,
        content     TEXT NOT NULL,
        embedding   REAL[] NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS document_chunks_collection_idx \
     ON document_chunks (collection, embedder)",
    // Tables created before ingestion was keyed by source file.
    "ALTER TABLE documents ADD COLUMN IF NOT EXISTS source TEXT",
    "ALTER TABLE document_chunks ADD COLUMN IF NOT EXISTS source TEXT NOT NULL DEFAULT ''",
    "CREATE UNIQUE INDEX IF NOT EXISTS documents_source_idx ON documents (source)",
    "CREATE INDEX IF NOT EXISTS document_chunks_source_idx \
     ON document_chunks (collection, source)",
];

/// Creates the pipeline's tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .context("failed to create database schema")?;
    }
    tx.commit().await?;
    info!("Database schema ready");
    Ok(())
}
