//! Text embedders used by the semantic index.
//!
//! - `HashEmbedder`: feature hashing with a fixed SipHash seed. Deterministic, no network.
//! - `RemoteEmbedder`: the provider's embeddings endpoint via `llm_client`.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use crate::errors::PipelineError;
use crate::llm_client::OpenAiClient;

/// Fixed seed for deterministic hashing.
/// Changing these values changes every embedding; bump `HashEmbedder::name` if you do.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

pub const DEFAULT_HASH_DIMENSION: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifies the vector space. Stored alongside vectors so spaces never mix.
    fn name(&self) -> &str;

    /// Embeds each text. Output order matches input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;
}

// ────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ────────────────────────────────────────────────────────────────────────────

pub struct HashEmbedder {
    dimension: usize,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("hash-v1-{dimension}"),
        }
    }

    fn hash_token(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    /// Embeds one text: unigrams at weight 1.0, bigrams at 0.5, sign-hashed, L2-normalized.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);

        let unigrams = tokens.iter().map(|t| (t.clone(), 1.0f32));
        let bigrams = tokens
            .windows(2)
            .map(|w| (format!("{} {}", w[0], w[1]), 0.5f32));

        for (token, weight) in unigrams.chain(bigrams) {
            let h = self.hash_token(&token);
            let idx = (h % self.dimension as u64) as usize;
            // Sign hashing: even hash → +weight, odd hash → -weight
            let sign = if self.hash_token(&format!("{token}_sign")) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign * weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Lowercased alphanumeric word tokens; `+` and `#` are kept so "c++" and "c#" survive.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteEmbedder
// ────────────────────────────────────────────────────────────────────────────

pub struct RemoteEmbedder {
    client: OpenAiClient,
    model: String,
}

impl RemoteEmbedder {
    pub fn new(client: OpenAiClient, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let vectors = self.client.embed(&self.model, texts).await?;
        if vectors.len() != texts.len() {
            return Err(PipelineError::Llm(format!(
                "embedding count mismatch: sent {}, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::similarity::cosine_similarity;

    #[test]
    fn test_hash_embedder_produces_normalized_vectors() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed_text("Python and Kubernetes in production");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_eq!(v.len(), DEFAULT_HASH_DIMENSION);
        assert!((norm - 1.0).abs() < 1e-5, "L2 norm should be 1.0, got {norm}");
    }

    #[test]
    fn test_hash_embedder_is_deterministic() {
        let embedder = HashEmbedder::default();
        assert_eq!(
            embedder.embed_text("team leadership"),
            embedder.embed_text("team leadership")
        );
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashEmbedder::new(8).embed_text("  ... ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_related_text_scores_higher_than_unrelated() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed_text("python");
        let related = embedder.embed_text("Five years of Python development");
        let unrelated = embedder.embed_text("Forklift operator licence");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_tokenize_keeps_language_symbols() {
        assert_eq!(tokenize("C++, C# & Rust!"), vec!["c++", "c#", "rust"]);
    }
}
