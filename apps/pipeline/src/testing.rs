//! In-memory doubles and fixtures for the test suite. No network or database needed.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::PipelineError;
use crate::generation::evaluator::{DimensionScores, EvaluationResult, QualityEvaluator};
use crate::generation::generator::{
    CoverLetterDraft, GenerationMetadata, LetterGenerator, LetterRequest,
};
use crate::ingest::pdf::DocumentExtractor;
use crate::llm_client::{CallOptions, Completion, LanguageModel, LlmError, Usage};
use crate::models::document::{DocumentMetadata, DocumentRow};
use crate::models::job::{
    JobRow, JobStatus, NewJobRecord, PersistedJobRecord, PostingLink, StructuredJob,
};
use crate::retrieval::embedding::HashEmbedder;
use crate::retrieval::index::{IndexDocument, SemanticIndex};
use crate::retrieval::similarity::top_k;
use crate::scraping::JobBoard;
use crate::store::{DocumentStore, InsertOutcome, JobStore};

// ────────────────────────────────────────────────────────────────────────────
// Language model
// ────────────────────────────────────────────────────────────────────────────

/// Replays canned responses in order and records every prompt it receives.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    repeat: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Responds with `responses` in order; further calls fail with a non-retryable API error.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(str::to_string).collect()),
            repeat: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Responds with `response` on every call.
    pub fn repeating(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            repeat: Some(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(
        &self,
        prompt: &str,
        _system: &str,
        _options: CallOptions,
    ) -> Result<Completion, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.responses.lock().unwrap().pop_front();
        let text = next.or_else(|| self.repeat.clone()).ok_or(LlmError::Api {
            status: 400,
            message: "script exhausted".to_string(),
        })?;

        Ok(Completion {
            usage: Usage {
                prompt_tokens: (prompt.len() / 4) as u32 + 1,
                completion_tokens: (text.len() / 4) as u32 + 1,
            },
            text,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stores
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryJobStore {
    records: Mutex<Vec<PersistedJobRecord>>,
    inserts: AtomicUsize,
}

impl MemoryJobStore {
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn exists(&self, url: &str) -> Result<bool, PipelineError> {
        Ok(self.records.lock().unwrap().iter().any(|r| r.url == url))
    }

    async fn insert_if_absent(
        &self,
        record: &NewJobRecord,
    ) -> Result<InsertOutcome, PipelineError> {
        let mut records = self.records.lock().unwrap();
        if records.iter().any(|r| r.url == record.url) {
            return Ok(InsertOutcome::Duplicate);
        }
        let id = records.len() as i64 + 1;
        records.push(PersistedJobRecord::from_new(id, record.clone(), Utc::now()));
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(InsertOutcome::Inserted { id })
    }

    async fn select_all(
        &self,
        status: Option<JobStatus>,
    ) -> Result<Vec<PersistedJobRecord>, PipelineError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .rev()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect())
    }
}

/// Rows keyed by source file, in insertion order.
#[derive(Default)]
pub struct MemoryDocumentStore {
    rows: Mutex<Vec<(String, DocumentRow)>>,
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_document(
        &self,
        source: &str,
        document: &DocumentMetadata,
    ) -> Result<i64, PipelineError> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.iter().position(|(s, _)| s == source);
        let doc_id = match existing {
            Some(i) => rows[i].1.doc_id,
            None => rows.len() as i64 + 1,
        };
        let row = DocumentRow {
            doc_id,
            title: document.title.clone(),
            content: document.content.clone(),
            category: document.category.clone(),
            size: document.size as i32,
            created_on: Utc::now(),
        };
        match existing {
            Some(i) => rows[i].1 = row,
            None => rows.push((source.to_string(), row)),
        }
        Ok(doc_id)
    }

    async fn all_documents(&self) -> Result<Vec<DocumentRow>, PipelineError> {
        Ok(self.rows.lock().unwrap().iter().map(|(_, r)| r.clone()).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Semantic index
// ────────────────────────────────────────────────────────────────────────────

/// Hash-embedded, in-process index.
#[derive(Default)]
pub struct MemoryIndex {
    embedder: HashEmbedder,
    /// `(source, content, vector)`
    entries: Mutex<Vec<(String, String, Vec<f32>)>>,
    searches: AtomicUsize,
}

impl MemoryIndex {
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SemanticIndex for MemoryIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>, PipelineError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let entries = self.entries.lock().unwrap();
        let vectors: Vec<Vec<f32>> = entries.iter().map(|(_, _, v)| v.clone()).collect();
        let query = self.embedder.embed_text(query);
        Ok(top_k(&query, &vectors, k)
            .into_iter()
            .map(|i| entries[i].1.clone())
            .collect())
    }

    async fn add(&self, source: &str, documents: &[IndexDocument]) -> Result<usize, PipelineError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(s, _, _)| s != source);
        for doc in documents {
            entries.push((
                source.to_string(),
                doc.content.clone(),
                self.embedder.embed_text(&doc.content),
            ));
        }
        Ok(documents.len())
    }
}

/// An index whose backend is unreachable.
pub struct FailingIndex;

#[async_trait]
impl SemanticIndex for FailingIndex {
    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<String>, PipelineError> {
        Err(PipelineError::Connection("index unreachable".to_string()))
    }

    async fn add(
        &self,
        _source: &str,
        _documents: &[IndexDocument],
    ) -> Result<usize, PipelineError> {
        Err(PipelineError::Connection("index unreachable".to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborators
// ────────────────────────────────────────────────────────────────────────────

/// Serves fixed `(title, url, description)` postings.
pub struct StaticJobBoard {
    postings: Vec<(String, String, String)>,
}

impl StaticJobBoard {
    pub fn new(postings: Vec<(&str, &str, &str)>) -> Self {
        Self {
            postings: postings
                .into_iter()
                .map(|(t, u, d)| (t.to_string(), u.to_string(), d.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl JobBoard for StaticJobBoard {
    async fn posting_links(&self) -> Result<Vec<PostingLink>, PipelineError> {
        Ok(self
            .postings
            .iter()
            .map(|(title, url, _)| PostingLink {
                title: title.clone(),
                url: url.clone(),
            })
            .collect())
    }

    async fn description(&self, url: &str) -> Result<String, PipelineError> {
        self.postings
            .iter()
            .find(|(_, u, _)| u == url)
            .map(|(_, _, d)| d.clone())
            .ok_or_else(|| PipelineError::ElementNotFound {
                selector: ".description__text".to_string(),
                url: url.to_string(),
            })
    }
}

/// Returns the same text for every file.
pub struct StaticExtractor {
    text: String,
}

impl StaticExtractor {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
        }
    }
}

#[async_trait]
impl DocumentExtractor for StaticExtractor {
    async fn extract_text(&self, _path: &Path) -> Result<String, PipelineError> {
        Ok(self.text.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation doubles
// ────────────────────────────────────────────────────────────────────────────

/// Produces "Draft N" letters and records the feedback each call received.
#[derive(Default)]
pub struct StubGenerator {
    calls: AtomicU32,
    feedback: Mutex<Vec<Option<f64>>>,
    failing: bool,
}

impl StubGenerator {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The `result` of the feedback passed to each call, in call order.
    pub fn feedback_seen(&self) -> Vec<Option<f64>> {
        self.feedback.lock().unwrap().clone()
    }
}

#[async_trait]
impl LetterGenerator for StubGenerator {
    async fn generate(&self, request: LetterRequest<'_>) -> Result<CoverLetterDraft, PipelineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.feedback
            .lock()
            .unwrap()
            .push(request.feedback.map(|f| f.result));
        if self.failing {
            return Err(PipelineError::SchemaConformance("stub failure".to_string()));
        }
        Ok(CoverLetterDraft {
            company: request.job.company_name.clone(),
            role: "Engineering Manager".to_string(),
            opener: format!("Draft {n}"),
            body: "Body".to_string(),
            bullet_points: "- Point".to_string(),
            motivation: "Motivation".to_string(),
            closing: "Closing".to_string(),
            metadata: GenerationMetadata {
                latency_ms: 1,
                token_count: 10,
            },
        })
    }
}

/// Returns uniform evaluations with the scripted results; repeats the last one.
pub struct ScriptedEvaluator {
    results: Vec<f64>,
    calls: AtomicUsize,
}

impl ScriptedEvaluator {
    pub fn new(results: Vec<f64>) -> Self {
        Self {
            results,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QualityEvaluator for ScriptedEvaluator {
    async fn evaluate(
        &self,
        _draft_text: &str,
        _job_description: &str,
    ) -> Result<EvaluationResult, PipelineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = self
            .results
            .get(n)
            .or(self.results.last())
            .copied()
            .unwrap_or(0.0);
        Ok(EvaluationResult::from_scores(DimensionScores::uniform(result)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fixtures
// ────────────────────────────────────────────────────────────────────────────

pub fn structured_job() -> StructuredJob {
    StructuredJob {
        company_name: "Acme GmbH".to_string(),
        contact_person: "Jana Schulz".to_string(),
        employment_type: "Full-time".to_string(),
        requirements: "Python, people leadership, SQL".to_string(),
        nice_to_haves: "Kubernetes, Rust".to_string(),
        experience_level: "Senior, 5 years".to_string(),
        education_level: "Bachelors in Computer Science".to_string(),
        compensation: "EUR 90,000 - 110,000".to_string(),
        company_culture: "Remote-first, ownership, learning".to_string(),
        location: "Berlin, hybrid".to_string(),
        company_size: "200-500".to_string(),
        company_industry: "Logistics software".to_string(),
        work_hours: "Flexible, 40 hours".to_string(),
        summary: "Lead the platform engineering team".to_string(),
    }
}

pub fn structured_job_json() -> String {
    serde_json::to_string(&structured_job()).unwrap()
}

/// A model response for `CoverLetterDraft` with the given opener. The other sections carry
/// no function words, so language detection depends on the opener alone.
pub fn draft_json(opener: &str) -> String {
    serde_json::json!({
        "company": "Acme GmbH",
        "role": "Engineering Manager",
        "opener": opener,
        "body": "Python, Kubernetes, PostgreSQL.",
        "bullet_points": "- 12 engineers\n- 40% faster releases",
        "motivation": "Platform engineering.",
        "closing": "Max Mustermann",
    })
    .to_string()
}

pub fn job_row(url: &str, status: &str, match_score: i16) -> JobRow {
    let job = structured_job();
    JobRow {
        id: 1,
        job_title: "Engineering Manager".to_string(),
        job_url: url.to_string(),
        company_name: job.company_name,
        contact_person: job.contact_person,
        employment_type: job.employment_type,
        requirements: job.requirements,
        nice_to_haves: job.nice_to_haves,
        experience_level: job.experience_level,
        education_level: job.education_level,
        compensation: job.compensation,
        company_culture: job.company_culture,
        location: job.location,
        company_size: job.company_size,
        company_industry: job.company_industry,
        work_hours: job.work_hours,
        summary: job.summary,
        match_score,
        status: status.to_string(),
        applied: None,
        created_at: Utc::now(),
    }
}
