//! Job triage: scrape postings, gate them on match score, store the ones worth applying to.
//!
//! Per posting: dedup check → fetch description → match gate → structured extraction →
//! insert. A failing posting is recorded in the report and the run continues; only a fatal
//! error (configuration, cancellation) stops it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::errors::{Disposition, PipelineError};
use crate::extraction::job::extract_job;
use crate::extraction::StructuredExtractor;
use crate::matching::scorer::{MatchGate, MatchScorer};
use crate::models::job::{JobPosting, NewJobRecord, PostingLink};
use crate::scraping::JobBoard;
use crate::store::{InsertOutcome, JobStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostingOutcome {
    Stored,
    Duplicate,
    BelowThreshold(u8),
}

#[derive(Debug, Default, Serialize)]
pub struct TriageReport {
    pub stored: Vec<String>,
    pub duplicates: Vec<String>,
    /// `(url, match score)`
    pub below_threshold: Vec<(String, u8)>,
    /// `(url, reason)`
    pub failed: Vec<(String, String)>,
}

impl TriageReport {
    pub fn total(&self) -> usize {
        self.stored.len() + self.duplicates.len() + self.below_threshold.len() + self.failed.len()
    }
}

pub struct Triage {
    board: Arc<dyn JobBoard>,
    scorer: Arc<dyn MatchScorer>,
    extractor: StructuredExtractor,
    store: Arc<dyn JobStore>,
    gate: MatchGate,
}

impl Triage {
    pub fn new(
        board: Arc<dyn JobBoard>,
        scorer: Arc<dyn MatchScorer>,
        extractor: StructuredExtractor,
        store: Arc<dyn JobStore>,
        gate: MatchGate,
    ) -> Self {
        Self {
            board,
            scorer,
            extractor,
            store,
            gate,
        }
    }

    pub async fn run(
        &self,
        profile_summary: &str,
        cancel: &AtomicBool,
    ) -> Result<TriageReport, PipelineError> {
        let links = self.board.posting_links().await?;
        let mut report = TriageReport::default();

        for (n, link) in links.iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                warn!("Triage cancelled after {} of {} postings", n, links.len());
                return Err(PipelineError::Cancelled);
            }
            info!("[{}/{}] {} ({})", n + 1, links.len(), link.title, link.url);

            match self.process(link, profile_summary).await {
                Ok(PostingOutcome::Stored) => report.stored.push(link.url.clone()),
                Ok(PostingOutcome::Duplicate) => report.duplicates.push(link.url.clone()),
                Ok(PostingOutcome::BelowThreshold(score)) => {
                    report.below_threshold.push((link.url.clone(), score))
                }
                Err(e) => match e.disposition() {
                    Disposition::Fatal => return Err(e),
                    Disposition::SkipItem => {
                        warn!("Skipping {}: {}", link.url, e);
                        report.failed.push((link.url.clone(), e.to_string()));
                    }
                    Disposition::AbortJob => {
                        error!("Failed to process {}: {}", link.url, e);
                        report.failed.push((link.url.clone(), e.to_string()));
                    }
                },
            }
        }

        info!(
            "Triage finished ({} postings): {} stored, {} duplicates, {} below threshold, {} failed",
            report.total(),
            report.stored.len(),
            report.duplicates.len(),
            report.below_threshold.len(),
            report.failed.len()
        );
        Ok(report)
    }

    async fn process(
        &self,
        link: &PostingLink,
        profile_summary: &str,
    ) -> Result<PostingOutcome, PipelineError> {
        if self.store.exists(&link.url).await? {
            info!("Already stored: {}", link.url);
            return Ok(PostingOutcome::Duplicate);
        }

        let posting = JobPosting {
            title: link.title.clone(),
            url: link.url.clone(),
            raw_description: self.board.description(&link.url).await?,
        };

        let score = self
            .scorer
            .score(profile_summary, &posting.raw_description)
            .await?;
        if !self.gate.passes(score) {
            info!(
                "Match {} below threshold {} for {}",
                score,
                self.gate.threshold(),
                posting.url
            );
            return Ok(PostingOutcome::BelowThreshold(score.value()));
        }

        let job = extract_job(&self.extractor, &posting.raw_description).await?;
        let record = NewJobRecord {
            title: posting.title,
            url: posting.url,
            job,
            match_score: score.value(),
        };

        match self.store.insert_if_absent(&record).await? {
            InsertOutcome::Inserted { .. } => Ok(PostingOutcome::Stored),
            InsertOutcome::Duplicate => Ok(PostingOutcome::Duplicate),
        }
    }
}
