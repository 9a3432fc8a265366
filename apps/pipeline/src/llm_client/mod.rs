/// LLM Client: the single point of entry for all model API calls in the pipeline.
///
/// ARCHITECTURAL RULE: No other module may call the model provider directly.
/// All chat and embedding requests MUST go through this module.
///
/// Callers depend on the `LanguageModel` trait so tests can script responses.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmSettings;

pub mod prompts;

const MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Per-call sampling options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CallOptions {
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response.
    pub json: bool,
}

impl CallOptions {
    /// Deterministic JSON output, used for extraction and evaluation.
    pub const fn json_exact() -> Self {
        Self {
            temperature: Some(0.0),
            json: true,
        }
    }

    /// JSON output at the configured temperature, used for generation.
    pub const fn json_creative() -> Self {
        Self {
            temperature: None,
            json: true,
        }
    }

    pub const fn text() -> Self {
        Self {
            temperature: None,
            json: false,
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A single completed model call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: Usage,
}

/// The chat model abstraction every LLM-backed service is written against.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: CallOptions,
    ) -> Result<Completion, LlmError>;
}

/// Calls the model and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn call_json<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: &str,
    options: CallOptions,
) -> Result<(T, Usage), LlmError> {
    let completion = llm.complete(prompt, system, options).await?;
    let value = parse_json(&completion.text)?;
    Ok((value, completion.usage))
}

/// Deserializes model output, tolerating surrounding markdown code fences.
pub fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let text = strip_json_fences(text);
    if text.is_empty() {
        return Err(LlmError::EmptyContent);
    }
    serde_json::from_str(text).map_err(LlmError::Parse)
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (OpenAI-compatible chat completions + embeddings)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP client
// ────────────────────────────────────────────────────────────────────────────

/// The HTTP-backed model client used by all services in the pipeline.
/// Wraps the chat completions and embeddings APIs with retry logic.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    settings: LlmSettings,
}

impl OpenAiClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(settings.timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            settings,
        }
    }

    /// POSTs a JSON body, retrying on 429 (rate limit), 5xx and transport errors
    /// with exponential backoff.
    async fn post_with_retry<B, R>(&self, path: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.settings.base_url, path);
        let attempts = total_attempts(self.settings.max_retries);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1).min(5)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.settings.api_key)
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ProviderError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.settings.max_retries,
        }))
    }

    /// Embeds a batch of texts with the given embedding model. Output order matches input order.
    pub async fn embed(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut response: EmbeddingResponse = self
            .post_with_retry("embeddings", &EmbeddingRequest { model, input: texts })
            .await?;

        response.data.sort_by_key(|d| d.index);
        debug!("Embedded {} texts with {}", response.data.len(), model);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        options: CallOptions,
    ) -> Result<Completion, LlmError> {
        let request = ChatRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            temperature: options.temperature.unwrap_or(self.settings.temperature),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: options.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response: ChatResponse = self.post_with_retry("chat/completions", &request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!(
            "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
            response.usage.prompt_tokens, response.usage.completion_tokens
        );

        Ok(Completion {
            text,
            usage: response.usage,
        })
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
/// The first call plus `max_retries` retries.
fn total_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
