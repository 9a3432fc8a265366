use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or a value is out of range.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm: LlmSettings,
    pub pipeline: PipelineSettings,
    pub embedding: EmbeddingSettings,
    pub scrape: ScrapeSettings,
    pub paths: Paths,
    pub rust_log: String,
}

/// Options for the chat model client.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

/// Thresholds and bounds that drive the triage gate and the refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Extra attempts after a malformed model response.
    pub schema_retries: u32,
    /// Inclusive lower bound (0..=100) a match score must reach to be stored.
    pub match_threshold: u8,
    /// Inclusive lower bound (0..=1) a letter evaluation must reach to be accepted.
    pub acceptance_threshold: f64,
    pub max_iterations: u32,
    pub retrieval_k: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            schema_retries: 2,
            match_threshold: 75,
            acceptance_threshold: 0.8,
            max_iterations: 3,
            retrieval_k: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Local feature hashing. Deterministic, no network.
    Hash,
    /// Embeddings endpoint of the configured model provider.
    Remote,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hash" => Ok(EmbeddingBackend::Hash),
            "remote" => Ok(EmbeddingBackend::Remote),
            other => Err(format!("unknown embedding backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model: String,
}

/// Work arrangement filter used by the listings search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkType {
    Onsite,
    Remote,
    Hybrid,
}

impl WorkType {
    /// Numeric code expected by the listings site's `f_WT` query parameter.
    pub fn code(self) -> u8 {
        match self {
            WorkType::Onsite => 1,
            WorkType::Remote => 2,
            WorkType::Hybrid => 3,
        }
    }
}

impl FromStr for WorkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onsite" | "on-site" => Ok(WorkType::Onsite),
            "remote" => Ok(WorkType::Remote),
            "hybrid" => Ok(WorkType::Hybrid),
            other => Err(format!("unknown work type '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub search_url: String,
    pub keywords: Vec<String>,
    pub work_type: WorkType,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub files_dir: PathBuf,
    pub to_process_dir: PathBuf,
    pub processed_dir: PathBuf,
}

impl Paths {
    pub fn documents_json(&self) -> PathBuf {
        self.files_dir.join("documents.json")
    }

    pub fn job_description(&self) -> PathBuf {
        self.files_dir.join("job_description.txt")
    }

    pub fn text_artifact(&self, name: &str) -> PathBuf {
        self.files_dir.join(format!("{name}.txt"))
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let pipeline = PipelineSettings {
            schema_retries: env.parse_or("SCHEMA_RETRIES", 2)?,
            match_threshold: env.parse_or("MATCH_THRESHOLD", 75)?,
            acceptance_threshold: env.parse_or("ACCEPTANCE_THRESHOLD", 0.8)?,
            max_iterations: env.parse_or("MAX_ITERATIONS", 3)?,
            retrieval_k: env.parse_or("RETRIEVAL_K", 5)?,
        };
        pipeline.validate()?;

        let temperature: f32 = env.parse_or("LLM_TEMPERATURE", 0.7)?;
        if !(0.0..=2.0).contains(&temperature) {
            bail!("LLM_TEMPERATURE must be within 0.0..=2.0, got {temperature}");
        }

        let keywords = env
            .or("SEARCH_KEYWORDS", "engineering manager,python,AI,IT Manager")
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>();

        Ok(Config {
            database_url: env.require("DATABASE_URL")?,
            llm: LlmSettings {
                api_key: env.require("OPENAI_API_KEY")?,
                base_url: env
                    .or("LLM_BASE_URL", "https://api.openai.com/v1")
                    .trim_end_matches('/')
                    .to_string(),
                model: env.or("LLM_MODEL", "gpt-4o-mini"),
                temperature,
                max_retries: env.parse_or("LLM_MAX_RETRIES", 3)?,
                timeout_secs: env.parse_or("LLM_TIMEOUT_SECS", 120)?,
            },
            pipeline,
            embedding: EmbeddingSettings {
                backend: env.parse_or("EMBEDDING_BACKEND", EmbeddingBackend::Hash)?,
                model: env.or("EMBEDDING_MODEL", "text-embedding-3-small"),
            },
            scrape: ScrapeSettings {
                search_url: env.or("SEARCH_URL", "https://www.linkedin.com/jobs/search/"),
                keywords,
                work_type: env.parse_or("WORK_TYPE", WorkType::Remote)?,
                timeout_secs: env.parse_or("SCRAPE_TIMEOUT_SECS", 10)?,
            },
            paths: Paths {
                files_dir: PathBuf::from(env.or("FILES_DIR", "files")),
                to_process_dir: PathBuf::from(env.or("TO_PROCESS_DIR", "to_process")),
                processed_dir: PathBuf::from(env.or("PROCESSED_DIR", "processed")),
            },
            rust_log: env.or("RUST_LOG", "info"),
        })
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.match_threshold > 100 {
            bail!("MATCH_THRESHOLD must be within 0..=100, got {}", self.match_threshold);
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            bail!(
                "ACCEPTANCE_THRESHOLD must be within 0.0..=1.0, got {}",
                self.acceptance_threshold
            );
        }
        if self.max_iterations == 0 {
            bail!("MAX_ITERATIONS must be at least 1");
        }
        if self.retrieval_k == 0 {
            bail!("RETRIEVAL_K must be at least 1");
        }
        Ok(())
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn require(&self, key: &str) -> Result<String> {
        (self.0)(key)
            .filter(|v| !v.trim().is_empty())
            .with_context(|| format!("Required environment variable '{key}' is not set"))
    }

    fn or(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.0)(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
            None => Ok(default),
        }
    }
}
