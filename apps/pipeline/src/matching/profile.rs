//! Candidate profile summary: the text the match scorer compares job postings against.

use tracing::info;

use crate::errors::PipelineError;
use crate::llm_client::{CallOptions, LanguageModel};
use crate::matching::prompts::{PROFILE_SUMMARY_PROMPT_TEMPLATE, PROFILE_SUMMARY_SYSTEM};
use crate::models::document::ExportedDocument;

/// Summarizes the candidate's stored documents into a single profile text.
pub async fn create_profile_summary(
    llm: &dyn LanguageModel,
    documents: &[ExportedDocument],
) -> Result<String, PipelineError> {
    if documents.is_empty() {
        return Err(PipelineError::InvalidInput(
            "no documents stored; run ingest before building a profile summary".to_string(),
        ));
    }

    let prompt = PROFILE_SUMMARY_PROMPT_TEMPLATE.replace("{documents}", &render_documents(documents));
    let completion = llm
        .complete(&prompt, PROFILE_SUMMARY_SYSTEM, CallOptions::text())
        .await?;

    let summary = completion.text.trim().to_string();
    if summary.is_empty() {
        return Err(PipelineError::SchemaConformance(
            "profile summary is empty".to_string(),
        ));
    }

    info!(
        "Profile summary created from {} documents ({} tokens)",
        documents.len(),
        completion.usage.total()
    );
    Ok(summary)
}

fn render_documents(documents: &[ExportedDocument]) -> String {
    documents
        .iter()
        .map(|d| format!("### {} ({})\n{}", d.title, d.category, d.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}
