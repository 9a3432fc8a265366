use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::models::document::{DocumentMetadata, DocumentRow};
use crate::models::job::{JobRow, JobStatus, NewJobRecord, PersistedJobRecord};
use crate::store::{DocumentStore, InsertOutcome, JobStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn exists(&self, url: &str) -> Result<bool, PipelineError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE job_url = $1)")
                .bind(url)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn insert_if_absent(
        &self,
        record: &NewJobRecord,
    ) -> Result<InsertOutcome, PipelineError> {
        let mut tx = self.pool.begin().await?;

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM jobs WHERE job_url = $1)")
                .bind(&record.url)
                .fetch_one(&mut *tx)
                .await?;
        if exists {
            debug!("Job already stored, skipping insert: {}", record.url);
            return Ok(InsertOutcome::Duplicate);
        }

        let job = &record.job;
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO jobs (
                job_title, job_url, company_name, contact_person, employment_type,
                requirements, nice_to_haves, experience_level, education_level,
                compensation, company_culture, location, company_size,
                company_industry, work_hours, summary, match_score, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (job_url) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&record.title)
        .bind(&record.url)
        .bind(&job.company_name)
        .bind(&job.contact_person)
        .bind(&job.employment_type)
        .bind(&job.requirements)
        .bind(&job.nice_to_haves)
        .bind(&job.experience_level)
        .bind(&job.education_level)
        .bind(&job.compensation)
        .bind(&job.company_culture)
        .bind(&job.location)
        .bind(&job.company_size)
        .bind(&job.company_industry)
        .bind(&job.work_hours)
        .bind(&job.summary)
        .bind(record.match_score as i16)
        .bind(JobStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        match inserted {
            Some(id) => {
                info!("Stored job {} ({})", record.title, record.url);
                Ok(InsertOutcome::Inserted { id })
            }
            // A concurrent run inserted the same url between the check and the insert.
            None => Ok(InsertOutcome::Duplicate),
        }
    }

    async fn select_all(
        &self,
        status: Option<JobStatus>,
    ) -> Result<Vec<PersistedJobRecord>, PipelineError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(status.map(JobStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            match PersistedJobRecord::try_from(row) {
                Ok(record) => records.push(record),
                Err(reason) => warn!("Skipping malformed job row {}: {}", id, reason),
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn upsert_document(
        &self,
        source: &str,
        document: &DocumentMetadata,
    ) -> Result<i64, PipelineError> {
        let mut tx = self.pool.begin().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO documents (source, title, content, category, size)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source) DO UPDATE
            SET title = EXCLUDED.title,
                content = EXCLUDED.content,
                category = EXCLUDED.category,
                size = EXCLUDED.size
            RETURNING doc_id
            "#,
        )
        .bind(source)
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.category)
        .bind(i32::try_from(document.size).unwrap_or(i32::MAX))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            "Stored document '{}' ({}) from {}",
            document.title, document.category, source
        );
        Ok(id)
    }

    async fn all_documents(&self) -> Result<Vec<DocumentRow>, PipelineError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT doc_id, title, content, category, size, created_on FROM documents ORDER BY doc_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
