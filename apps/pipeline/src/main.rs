mod config;
mod db;
mod errors;
mod extraction;
mod generation;
mod ingest;
mod llm_client;
mod matching;
mod models;
mod pipeline;
mod retrieval;
mod scraping;
mod store;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingBackend};
use crate::db::{create_pool, ensure_schema};
use crate::extraction::StructuredExtractor;
use crate::generation::evaluator::LlmQualityEvaluator;
use crate::generation::generator::LlmLetterGenerator;
use crate::generation::refinement::{RefinementLoop, RefinementPolicy};
use crate::ingest::documents::DocumentIngestor;
use crate::ingest::export::{export_documents, write_text_artifact};
use crate::ingest::pdf::PdfExtractor;
use crate::llm_client::{LanguageModel, OpenAiClient};
use crate::matching::profile::create_profile_summary;
use crate::matching::scorer::{LlmMatchScorer, MatchGate};
use crate::models::job::JobStatus;
use crate::pipeline::letter::LetterPipeline;
use crate::pipeline::triage::Triage;
use crate::retrieval::embedding::{Embedder, HashEmbedder, RemoteEmbedder};
use crate::retrieval::index::{PgSemanticIndex, EVIDENCE_COLLECTION};
use crate::retrieval::retriever::EvidenceRetriever;
use crate::scraping::HttpListingScraper;
use crate::store::{DocumentStore, JobStore, PgStore};

const PROFILE_SUMMARY: &str = "profile_summary";
const COVER_LETTER: &str = "cover_letter";

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Job application pipeline - ingest documents, triage postings, write cover letters")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest PDFs from the to_process directory, then export documents.json
    Ingest,

    /// Export stored documents to documents.json
    Export,

    /// Build the candidate profile summary from stored documents
    Summary {
        /// Rebuild even if a summary file already exists
        #[arg(long)]
        refresh: bool,
    },

    /// Scrape postings, score them against the profile and store the ones that pass
    Triage {
        /// Override the match threshold (0-100)
        #[arg(short, long)]
        threshold: Option<u8>,
    },

    /// Generate a cover letter for a job description
    Letter {
        /// Job description file (defaults to files/job_description.txt)
        #[arg(short, long)]
        job_file: Option<PathBuf>,

        /// Override the iteration bound
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Override the acceptance threshold (0.0-1.0)
        #[arg(short, long)]
        acceptance: Option<f64>,
    },

    /// List stored jobs
    Jobs {
        /// Filter by status (pending, approved, rejected)
        #[arg(short, long)]
        status: Option<JobStatus>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pipeline v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let store = Arc::new(PgStore::new(db.clone()));

    let client = OpenAiClient::new(config.llm.clone());
    let llm: Arc<dyn LanguageModel> = Arc::new(client.clone());
    info!("LLM client initialized (model: {})", config.llm.model);

    let embedder: Arc<dyn Embedder> = match config.embedding.backend {
        EmbeddingBackend::Hash => Arc::new(HashEmbedder::default()),
        EmbeddingBackend::Remote => Arc::new(RemoteEmbedder::new(
            client.clone(),
            config.embedding.model.clone(),
        )),
    };
    info!("Embedder: {}", embedder.name());
    let index = Arc::new(PgSemanticIndex::new(db, embedder, EVIDENCE_COLLECTION));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current step");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let retries = config.pipeline.schema_retries;

    match cli.command {
        Commands::Ingest => {
            let ingestor = DocumentIngestor::new(
                Arc::new(PdfExtractor),
                StructuredExtractor::new(llm.clone(), retries),
                store.clone(),
                index,
            );
            let report = ingestor.ingest_pending(&config.paths).await?;
            info!(
                "Ingested {} documents ({} chunks), {} without text, {} failed",
                report.ingested.len(),
                report.chunks,
                report.empty.len(),
                report.failed.len()
            );
            export_documents(store.as_ref(), &config.paths.documents_json()).await?;
        }

        Commands::Export => {
            export_documents(store.as_ref(), &config.paths.documents_json()).await?;
        }

        Commands::Summary { refresh } => {
            let summary = profile_summary(&config, llm.as_ref(), store.as_ref(), refresh).await?;
            println!("{summary}");
        }

        Commands::Triage { threshold } => {
            if let Some(threshold) = threshold {
                config.pipeline.match_threshold = threshold;
                config.pipeline.validate()?;
            }
            let summary = profile_summary(&config, llm.as_ref(), store.as_ref(), false).await?;
            let triage = Triage::new(
                Arc::new(HttpListingScraper::new(config.scrape.clone())),
                Arc::new(LlmMatchScorer::new(llm.clone(), retries)),
                StructuredExtractor::new(llm.clone(), retries),
                store.clone(),
                MatchGate::new(config.pipeline.match_threshold),
            );
            let report = triage.run(&summary, &cancel).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Letter {
            job_file,
            max_iterations,
            acceptance,
        } => {
            if let Some(n) = max_iterations {
                config.pipeline.max_iterations = n;
            }
            if let Some(a) = acceptance {
                config.pipeline.acceptance_threshold = a;
            }
            config.pipeline.validate()?;

            let job_file = job_file.unwrap_or_else(|| config.paths.job_description());
            let job_description = std::fs::read_to_string(&job_file)
                .with_context(|| format!("Failed to read {}", job_file.display()))?;

            let letters = LetterPipeline::new(
                StructuredExtractor::new(llm.clone(), retries),
                RefinementLoop::new(
                    EvidenceRetriever::new(index),
                    Arc::new(LlmLetterGenerator::new(llm.clone(), retries)),
                    Arc::new(LlmQualityEvaluator::new(llm.clone(), retries)),
                    RefinementPolicy::from(&config.pipeline),
                    config.pipeline.retrieval_k,
                ),
            );
            let output = config.paths.text_artifact(COVER_LETTER);
            let outcome = letters.run(&job_description, &output, &cancel).await?;
            println!(
                "{} after {} iterations, result {:.3} -> {}",
                outcome.termination,
                outcome.iterations,
                outcome.evaluation.result,
                output.display()
            );
        }

        Commands::Jobs { status } => {
            for job in store.select_all(status).await? {
                println!(
                    "{:>5}  {:>3}  {:<8}  {}  {}",
                    job.id, job.match_score, job.status, job.job.company_name, job.url
                );
            }
        }
    }

    Ok(())
}

/// Reads the cached profile summary, or builds and caches it from the stored documents.
async fn profile_summary(
    config: &Config,
    llm: &dyn LanguageModel,
    store: &dyn DocumentStore,
    refresh: bool,
) -> Result<String> {
    let path = config.paths.text_artifact(PROFILE_SUMMARY);
    if !refresh {
        if let Ok(cached) = std::fs::read_to_string(&path) {
            if !cached.trim().is_empty() {
                info!("Using profile summary from {}", path.display());
                return Ok(cached);
            }
        }
    }

    let documents = export_documents(store, &config.paths.documents_json()).await?;
    let summary = create_profile_summary(llm, &documents).await?;
    write_text_artifact(&path, &summary)?;
    Ok(summary)
}
