//! Evidence Retriever: candidate snippets supporting each requirement category of a job.
//!
//! Per query term a top-k lookup runs against the semantic index; a category's evidence is
//! the concatenation of its terms' hits in term order. Duplicates across terms are kept.
//! An empty or unreachable index yields empty evidence, never an error.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::extraction::prompts::NOT_SPECIFIED;
use crate::models::job::{split_terms, StructuredJob};
use crate::retrieval::index::SemanticIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    Requirements,
    NiceToHaves,
    Experience,
}

impl EvidenceCategory {
    pub const ALL: [EvidenceCategory; 3] = [
        EvidenceCategory::Requirements,
        EvidenceCategory::NiceToHaves,
        EvidenceCategory::Experience,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EvidenceCategory::Requirements => "requirements",
            EvidenceCategory::NiceToHaves => "nice-to-haves",
            EvidenceCategory::Experience => "experience",
        }
    }
}

impl fmt::Display for EvidenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Query terms per category, in the order they appear in the job.
pub type CategoryTerms = BTreeMap<EvidenceCategory, Vec<String>>;

/// Ordered snippets per category. Fixed for the lifetime of one refinement run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evidence(BTreeMap<EvidenceCategory, Vec<String>>);

impl Evidence {
    pub fn get(&self, category: EvidenceCategory) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    pub fn categories(&self) -> impl Iterator<Item = EvidenceCategory> + '_ {
        self.0.keys().copied()
    }

    pub fn snippet_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.snippet_count() == 0
    }
}

/// Splits a job's comma-delimited requirement fields into per-category query terms.
/// The extractor's "Not specified" placeholder is not a term.
pub fn query_terms(job: &StructuredJob) -> CategoryTerms {
    let field_terms = |field: &str| -> Vec<String> {
        split_terms(field)
            .into_iter()
            .filter(|t| !t.eq_ignore_ascii_case(NOT_SPECIFIED))
            .collect()
    };
    let mut terms = CategoryTerms::new();
    terms.insert(EvidenceCategory::Requirements, field_terms(&job.requirements));
    terms.insert(EvidenceCategory::NiceToHaves, field_terms(&job.nice_to_haves));
    terms.insert(EvidenceCategory::Experience, field_terms(&job.experience_level));
    terms
}

#[derive(Clone)]
pub struct EvidenceRetriever {
    index: Arc<dyn SemanticIndex>,
}

impl EvidenceRetriever {
    pub fn new(index: Arc<dyn SemanticIndex>) -> Self {
        Self { index }
    }

    /// Every input category appears in the result, possibly with no snippets.
    pub async fn retrieve(&self, categories: &CategoryTerms, k: usize) -> Evidence {
        let mut evidence = BTreeMap::new();

        for (category, terms) in categories {
            let mut snippets = Vec::new();
            for term in terms {
                let term = term.trim();
                if term.is_empty() {
                    continue;
                }
                match self.index.search(term, k).await {
                    Ok(hits) => {
                        debug!("{} term '{}' matched {} snippets", category, term, hits.len());
                        snippets.extend(hits);
                    }
                    Err(e) => {
                        warn!(
                            "Semantic index lookup failed for {} term '{}': {}, continuing without evidence",
                            category, term, e
                        );
                    }
                }
            }
            evidence.insert(*category, snippets);
        }

        Evidence(evidence)
    }
}
