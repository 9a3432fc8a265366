use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A `(title, url)` pair from a listings page, before its description is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingLink {
    pub title: String,
    pub url: String,
}

/// A scraped job posting. Identity is `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub url: String,
    pub raw_description: String,
}

/// Structured job metadata extracted from a posting's text.
/// Comma-delimited fields (`requirements`, `nice_to_haves`, `experience_level`)
/// double as retrieval query terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredJob {
    pub company_name: String,
    pub contact_person: String,
    pub employment_type: String,
    pub requirements: String,
    pub nice_to_haves: String,
    pub experience_level: String,
    pub education_level: String,
    pub compensation: String,
    pub company_culture: String,
    pub location: String,
    pub company_size: String,
    pub company_industry: String,
    pub work_hours: String,
    pub summary: String,
}

impl StructuredJob {
    /// All fields in declaration order, paired with their names.
    pub fn fields(&self) -> [(&'static str, &str); 14] {
        [
            ("company_name", self.company_name.as_str()),
            ("contact_person", self.contact_person.as_str()),
            ("employment_type", self.employment_type.as_str()),
            ("requirements", self.requirements.as_str()),
            ("nice_to_haves", self.nice_to_haves.as_str()),
            ("experience_level", self.experience_level.as_str()),
            ("education_level", self.education_level.as_str()),
            ("compensation", self.compensation.as_str()),
            ("company_culture", self.company_culture.as_str()),
            ("location", self.location.as_str()),
            ("company_size", self.company_size.as_str()),
            ("company_industry", self.company_industry.as_str()),
            ("work_hours", self.work_hours.as_str()),
            ("summary", self.summary.as_str()),
        ]
    }
}

/// Splits a comma-delimited field into trimmed, non-empty terms, preserving order.
pub fn split_terms(field: &str) -> Vec<String> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Review lifecycle of a stored job. Mutated by a reviewer outside the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "approved" => Ok(JobStatus::Approved),
            "rejected" => Ok(JobStatus::Rejected),
            other => Err(format!("unknown job status '{other}'")),
        }
    }
}

/// Everything needed to insert a job that cleared the match gate.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobRecord {
    pub title: String,
    pub url: String,
    pub job: StructuredJob,
    pub match_score: u8,
}

/// Row shape of the `jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub job_title: String,
    pub job_url: String,
    pub company_name: String,
    pub contact_person: String,
    pub employment_type: String,
    pub requirements: String,
    pub nice_to_haves: String,
    pub experience_level: String,
    pub education_level: String,
    pub compensation: String,
    pub company_culture: String,
    pub location: String,
    pub company_size: String,
    pub company_industry: String,
    pub work_hours: String,
    pub summary: String,
    pub match_score: i16,
    pub status: String,
    pub applied: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A durable job record: metadata, final match score and review lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedJobRecord {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub job: StructuredJob,
    pub match_score: u8,
    pub status: JobStatus,
    pub applied: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PersistedJobRecord {
    /// Builds a freshly inserted record with default lifecycle fields.
    #[cfg(test)]
    pub fn from_new(id: i64, new: NewJobRecord, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title,
            url: new.url,
            job: new.job,
            match_score: new.match_score,
            status: JobStatus::Pending,
            applied: None,
            created_at,
        }
    }
}

impl TryFrom<JobRow> for PersistedJobRecord {
    type Error = String;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        let match_score = u8::try_from(row.match_score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| format!("match_score {} out of range", row.match_score))?;

        Ok(Self {
            id: row.id,
            title: row.job_title,
            url: row.job_url,
            job: StructuredJob {
                company_name: row.company_name,
                contact_person: row.contact_person,
                employment_type: row.employment_type,
                requirements: row.requirements,
                nice_to_haves: row.nice_to_haves,
                experience_level: row.experience_level,
                education_level: row.education_level,
                compensation: row.compensation,
                company_culture: row.company_culture,
                location: row.location,
                company_size: row.company_size,
                company_industry: row.company_industry,
                work_hours: row.work_hours,
                summary: row.summary,
            },
            match_score,
            status: row.status.parse()?,
            applied: row.applied,
            created_at: row.created_at,
        })
    }
}
