//! Cover letter pipeline: job description → StructuredJob → refinement loop → `cover_letter.txt`.
//!
//! Nothing is written until the loop reaches a terminal state, so an error or a cancellation
//! leaves the previous artifact untouched.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use tracing::info;
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::extraction::job::extract_job;
use crate::extraction::StructuredExtractor;
use crate::generation::refinement::{RefinementLoop, RefinementOutcome};
use crate::ingest::export::write_text_artifact;

pub struct LetterPipeline {
    extractor: StructuredExtractor,
    refinement: RefinementLoop,
}

impl LetterPipeline {
    pub fn new(extractor: StructuredExtractor, refinement: RefinementLoop) -> Self {
        Self {
            extractor,
            refinement,
        }
    }

    pub async fn run(
        &self,
        job_description: &str,
        output: &Path,
        cancel: &AtomicBool,
    ) -> Result<RefinementOutcome, PipelineError> {
        let run_id = Uuid::new_v4();
        info!("Letter run {} started", run_id);

        let job = extract_job(&self.extractor, job_description).await?;
        info!(
            "Run {}: {} / {} ({})",
            run_id, job.company_name, job.summary, job.location
        );

        let outcome = self.refinement.run(&job, job_description, cancel).await?;
        write_text_artifact(output, &outcome.draft.render())?;

        info!(
            "Run {} {} after {} iterations (result {:.3}, best {:.3}, history {:?})",
            run_id,
            outcome.termination,
            outcome.iterations,
            outcome.evaluation.result,
            outcome.best_score(),
            outcome.history
        );
        Ok(outcome)
    }
}
