//! Refinement Loop: bounded generate/evaluate cycle for one job.
//!
//! States: RetrieveEvidence → Generate → Evaluate → {Accept, Iterate, GiveUp}.
//! Evidence is retrieved once and reused by every iteration. Both terminal states yield a
//! draft; giving up returns the last draft, not the best one. Callers that want the best
//! score can read `RefinementOutcome::history`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PipelineSettings;
use crate::errors::PipelineError;
use crate::generation::evaluator::{EvaluationResult, QualityEvaluator};
use crate::generation::generator::{CoverLetterDraft, LetterGenerator, LetterRequest};
use crate::models::job::StructuredJob;
use crate::retrieval::retriever::{query_terms, Evidence, EvidenceRetriever};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefinementPolicy {
    pub acceptance_threshold: f64,
    /// Maximum number of generate/evaluate cycles. Always at least 1.
    pub max_iterations: u32,
}

impl RefinementPolicy {
    pub fn new(acceptance_threshold: f64, max_iterations: u32) -> Self {
        Self {
            acceptance_threshold,
            max_iterations: max_iterations.max(1),
        }
    }
}

impl Default for RefinementPolicy {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self::new(settings.acceptance_threshold, settings.max_iterations)
    }
}

impl From<&PipelineSettings> for RefinementPolicy {
    fn from(settings: &PipelineSettings) -> Self {
        Self::new(settings.acceptance_threshold, settings.max_iterations)
    }
}

/// What to do after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Iterate,
    GiveUp,
}

/// Transition out of EVALUATE. `iterations` is the number of completed cycles.
pub fn decide(result: f64, iterations: u32, policy: &RefinementPolicy) -> Decision {
    if result >= policy.acceptance_threshold {
        Decision::Accept
    } else if iterations < policy.max_iterations {
        Decision::Iterate
    } else {
        Decision::GiveUp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Accepted,
    GaveUp,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Accepted => f.write_str("accepted"),
            Termination::GaveUp => f.write_str("gave up"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub draft: CoverLetterDraft,
    pub evaluation: EvaluationResult,
    pub termination: Termination,
    pub iterations: u32,
    /// Composite result of each iteration, in order.
    pub history: Vec<f64>,
}

impl RefinementOutcome {
    pub fn best_score(&self) -> f64 {
        self.history.iter().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug)]
enum LoopState {
    RetrieveEvidence,
    Generate,
    Evaluate(CoverLetterDraft),
    Iterate(CoverLetterDraft, EvaluationResult),
    Accept(CoverLetterDraft, EvaluationResult),
    GiveUp(CoverLetterDraft, EvaluationResult),
}

pub struct RefinementLoop {
    retriever: EvidenceRetriever,
    generator: Arc<dyn LetterGenerator>,
    evaluator: Arc<dyn QualityEvaluator>,
    policy: RefinementPolicy,
    retrieval_k: usize,
}

impl RefinementLoop {
    pub fn new(
        retriever: EvidenceRetriever,
        generator: Arc<dyn LetterGenerator>,
        evaluator: Arc<dyn QualityEvaluator>,
        policy: RefinementPolicy,
        retrieval_k: usize,
    ) -> Self {
        Self {
            retriever,
            generator,
            evaluator,
            policy,
            retrieval_k,
        }
    }

    /// Runs the loop to a terminal state.
    ///
    /// `cancel` is checked after each EVALUATE that decided to iterate; when set, the run ends
    /// with `PipelineError::Cancelled` before the next GENERATE.
    pub async fn run(
        &self,
        job: &StructuredJob,
        job_description: &str,
        cancel: &AtomicBool,
    ) -> Result<RefinementOutcome, PipelineError> {
        let mut evidence = Evidence::default();
        let mut feedback: Option<EvaluationResult> = None;
        let mut iterations = 0u32;
        let mut history = Vec::new();
        let mut state = LoopState::RetrieveEvidence;

        loop {
            state = match state {
                LoopState::RetrieveEvidence => {
                    evidence = self
                        .retriever
                        .retrieve(&query_terms(job), self.retrieval_k)
                        .await;
                    if evidence.is_empty() {
                        warn!("No candidate evidence found; drafting from the job description alone");
                    } else {
                        info!("Retrieved {} evidence snippets", evidence.snippet_count());
                    }
                    LoopState::Generate
                }
                LoopState::Generate => {
                    let draft = self
                        .generator
                        .generate(LetterRequest {
                            job,
                            job_description,
                            evidence: &evidence,
                            feedback: feedback.as_ref(),
                        })
                        .await?;
                    LoopState::Evaluate(draft)
                }
                LoopState::Evaluate(draft) => {
                    let evaluation = self
                        .evaluator
                        .evaluate(&draft.render(), job_description)
                        .await?;
                    iterations += 1;
                    history.push(evaluation.result);
                    info!(
                        "Iteration {}/{}: result={:.3} (threshold {:.3})",
                        iterations,
                        self.policy.max_iterations,
                        evaluation.result,
                        self.policy.acceptance_threshold
                    );
                    match decide(evaluation.result, iterations, &self.policy) {
                        Decision::Accept => LoopState::Accept(draft, evaluation),
                        Decision::Iterate => LoopState::Iterate(draft, evaluation),
                        Decision::GiveUp => LoopState::GiveUp(draft, evaluation),
                    }
                }
                LoopState::Iterate(_superseded, evaluation) => {
                    if cancel.load(Ordering::SeqCst) {
                        warn!("Refinement cancelled after {} iterations", iterations);
                        return Err(PipelineError::Cancelled);
                    }
                    debug!("Draft below threshold; regenerating with feedback");
                    feedback = Some(evaluation);
                    LoopState::Generate
                }
                LoopState::Accept(draft, evaluation) => {
                    return Ok(self.finish(draft, evaluation, Termination::Accepted, iterations, history));
                }
                LoopState::GiveUp(draft, evaluation) => {
                    return Ok(self.finish(draft, evaluation, Termination::GaveUp, iterations, history));
                }
            };
        }
    }

    fn finish(
        &self,
        draft: CoverLetterDraft,
        evaluation: EvaluationResult,
        termination: Termination,
        iterations: u32,
        history: Vec<f64>,
    ) -> RefinementOutcome {
        info!(
            "Refinement {} after {} iterations: result={:.3}, history={:?}",
            termination, iterations, evaluation.result, history
        );
        RefinementOutcome {
            draft,
            evaluation,
            termination,
            iterations,
            history,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
