//! Match Scoring: coarse candidate/job compatibility used as a cheap triage gate.
//!
//! Default: `LlmMatchScorer` (one model call returning a flat percentage).
//! This is deliberately NOT the nine-dimension letter evaluation: it only decides whether a
//! posting is worth full extraction and storage.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::extraction::with_schema_retries;
use crate::llm_client::{call_json, CallOptions, LanguageModel};
use crate::matching::prompts::{MATCH_PROMPT_TEMPLATE, MATCH_SYSTEM};

/// Compatibility percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MatchScore(u8);

impl MatchScore {
    pub const MAX: u8 = 100;

    /// Returns `None` when `value` is outside `[0, 100]`.
    pub fn new(value: i64) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= Self::MAX)
            .map(MatchScore)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for MatchScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/100", self.0)
    }
}

/// The match scorer trait. Implement this to swap backends without touching the
/// triage pipeline.
#[async_trait]
pub trait MatchScorer: Send + Sync {
    async fn score(&self, profile_summary: &str, job_text: &str)
        -> Result<MatchScore, PipelineError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmMatchScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MatchResponse {
    #[serde(rename = "match")]
    value: i64,
}

pub struct LlmMatchScorer {
    llm: Arc<dyn LanguageModel>,
    schema_retries: u32,
}

impl LlmMatchScorer {
    pub fn new(llm: Arc<dyn LanguageModel>, schema_retries: u32) -> Self {
        Self {
            llm,
            schema_retries,
        }
    }
}

#[async_trait]
impl MatchScorer for LlmMatchScorer {
    async fn score(
        &self,
        profile_summary: &str,
        job_text: &str,
    ) -> Result<MatchScore, PipelineError> {
        if job_text.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "job text cannot be empty when scoring a match".to_string(),
            ));
        }

        let prompt = MATCH_PROMPT_TEMPLATE
            .replace("{profile_summary}", profile_summary)
            .replace("{job_text}", job_text);
        let prompt = prompt.as_str();
        let llm = self.llm.as_ref();

        let score = with_schema_retries("match score", self.schema_retries, move |_| async move {
            let (response, _usage) =
                call_json::<MatchResponse>(llm, prompt, MATCH_SYSTEM, CallOptions::json_exact())
                    .await?;
            MatchScore::new(response.value).ok_or_else(|| {
                PipelineError::SchemaConformance(format!(
                    "match {} is outside 0..=100",
                    response.value
                ))
            })
        })
        .await?;

        debug!("Match score: {}", score);
        Ok(score)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gate
// ────────────────────────────────────────────────────────────────────────────

/// Inclusive threshold a posting's match score must reach before it is extracted and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchGate {
    threshold: u8,
}

impl MatchGate {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold: threshold.min(MatchScore::MAX),
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    pub fn passes(&self, score: MatchScore) -> bool {
        score.value() >= self.threshold
    }
}
