/// LLM client: the single point of entry for every call to the external
/// judgment service (assessment and structured extraction adapters).
///
/// ARCHITECTURAL RULE: No other module may talk to the model API directly.
/// All LLM interactions MUST go through this module.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::AppError;

pub mod prompts;

const API_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited on every key after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No API key configured")]
    MissingApiKey,
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::RateLimited { .. } => AppError::RateLimited(err.to_string()),
            other => AppError::ExternalService(other.to_string()),
        }
    }
}

/// Connection settings for the external judgment service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Keys are rotated when one is rate limited.
    pub api_keys: Vec<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_retries: u32,
    /// First backoff delay; doubles on every further attempt.
    pub retry_base_delay: Duration,
}

impl LlmConfig {
    pub fn new(api_keys: Vec<String>) -> Self {
        Self {
            api_keys,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Outcome of a single HTTP exchange with one key.
enum Attempt {
    Done(LlmResponse),
    RateLimited(String),
    Transient(LlmError),
    Fatal(LlmError),
}

/// Wraps the messages API with retry, key rotation and structured output helpers.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    next_key: Arc<AtomicUsize>,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config,
            next_key: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Makes a raw call, returning the full response object.
    ///
    /// On 429 the next key is tried immediately; once every key is rate
    /// limited (or a 5xx/transport error occurs) the call backs off
    /// exponentially before the next round.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let keys = &self.config.api_keys;
        if keys.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let request_body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let start = self.next_key.fetch_add(1, Ordering::Relaxed);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_base_delay * (1 << (attempt - 1));
                warn!(
                    "LLM call round {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            for offset in 0..keys.len() {
                let key = &keys[(start + offset) % keys.len()];
                match self.send(key, &request_body).await {
                    Attempt::Done(response) => return Ok(response),
                    Attempt::RateLimited(body) => {
                        warn!(
                            "Rate limit hit for key ...{} (round {}/{})",
                            key_suffix(key),
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        debug!("Rate limit body: {body}");
                        last_error = Some(LlmError::RateLimited {
                            retries: self.config.max_retries,
                        });
                    }
                    Attempt::Transient(e) => {
                        last_error = Some(e);
                        break;
                    }
                    Attempt::Fatal(e) => return Err(e),
                }
            }
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: self.config.max_retries,
        }))
    }

    async fn send(&self, key: &str, body: &MessagesRequest<'_>) -> Attempt {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header("x-api-key", key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => return Attempt::Transient(LlmError::Http(e)),
        };

        let status = response.status();

        if status.as_u16() == 429 {
            return Attempt::RateLimited(response.text().await.unwrap_or_default());
        }

        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Attempt::Transient(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Attempt::Fatal(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match response.json::<LlmResponse>().await {
            Ok(parsed) => {
                debug!(
                    "LLM call succeeded: input_tokens={}, output_tokens={}",
                    parsed.usage.input_tokens, parsed.usage.output_tokens
                );
                Attempt::Done(parsed)
            }
            Err(e) => Attempt::Fatal(LlmError::Http(e)),
        }
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

fn key_suffix(key: &str) -> &str {
    let cut = key
        .char_indices()
        .rev()
        .nth(4)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &key[cut..]
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
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


#[cfg(test)]
mod tests {
    use super::test_support::{client_for, spawn_stub};
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_key_suffix_keeps_last_five_chars() {
        assert_eq!(key_suffix("sk-abcdefgh"), "defgh");
        assert_eq!(key_suffix("abc"), "abc");
    }

    #[tokio::test]
    async fn test_rate_limited_key_rotates_to_next() {
        let base = spawn_stub("```json\n{\"score\": 80}\n```").await;
        let client = client_for(base, &["limited", "good"]);

        let value: serde_json::Value = client.call_json("prompt", "system").await.unwrap();
        assert_eq!(value["score"], 80);
    }

    #[tokio::test]
    async fn test_all_keys_limited_surfaces_rate_limit() {
        let base = spawn_stub("{}").await;
        let client = client_for(base, &["limited"]);

        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::RateLimited { .. }));
        assert!(matches!(AppError::from(err), AppError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let base = spawn_stub("{}").await;
        let client = client_for(base, &["broken"]);

        let err = client.call("prompt", "system").await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_key_fails_fast() {
        let client = client_for("http://127.0.0.1:9".to_string(), &[]);
        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_non_json_reply_is_parse_error() {
        let base = spawn_stub("I cannot help with that").await;
        let client = client_for(base, &["good"]);

        let err = client
            .call_json::<serde_json::Value>("prompt", "system")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }
}
