//! Chat-model client for pod execution.
//!
//! A pod names one model (e.g. `ollama/llama3.2`); the provider is inferred
//! from the model id prefix and requests go to an OpenAI-compatible
//! `chat/completions` endpoint. The synchronous [`LLM::call`] wraps an async
//! `reqwest` POST with a bounded retry loop; agents depend only on the
//! [`ChatModel`] trait so tests can script replies.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Model used when a pod does not configure one.
pub const DEFAULT_MODEL: &str = "ollama/llama3.2";

/// Base URL used for `ollama/` models when the pod does not configure one.
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Base URL used for OpenAI-style models when the pod does not configure one.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Fallback request timeout, read when neither the pod nor the environment
/// configures one. Crew assembly exports this variable (see `pod::loader`).
pub const REQUEST_TIMEOUT_ENV: &str = "ORCAPOD_REQUEST_TIMEOUT_SECS";

/// Fallback connect timeout companion to [`REQUEST_TIMEOUT_ENV`].
pub const CONNECT_TIMEOUT_ENV: &str = "ORCAPOD_CONNECT_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 600;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by the chat client.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not set: {0}")]
    MissingApiKey(String),
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("malformed LLM response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A single chat message in OpenAI wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: String,
    pub content: String,
}

impl LLMMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// The seam between agents and the model: one prompt in, one reply out.
pub trait ChatModel: Send + Sync + std::fmt::Debug {
    fn chat(&self, messages: &[LLMMessage]) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// Provider inference
// ---------------------------------------------------------------------------

/// Provider family inferred from the model id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Local Ollama server speaking the OpenAI-compatible API under `/v1`.
    Ollama,
    /// Any OpenAI-style endpoint requiring a bearer token.
    OpenAICompatible,
}

impl Provider {
    /// Infer the provider from a model id such as `ollama/llama3.2`.
    pub fn infer(model: &str) -> Self {
        if model.starts_with("ollama/") {
            Self::Ollama
        } else {
            Self::OpenAICompatible
        }
    }
}

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Configured chat model for one pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLM {
    /// Model id as configured, provider prefix included.
    pub model: String,
    /// Endpoint base URL; provider default when `None`.
    pub base_url: Option<String>,
    /// Bearer token; resolved from `OPENAI_API_KEY` for OpenAI-style models.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds; environment fallback when `None`.
    pub timeout: Option<f64>,
    /// Maximum retry attempts after the first request.
    pub max_retries: u32,
}

impl Default for LLM {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, None)
    }
}

impl LLM {
    /// Create a client for `model`, resolving the API key from the
    /// environment for OpenAI-style models.
    pub fn new(model: impl Into<String>, base_url: Option<String>) -> Self {
        let model = model.into();
        let api_key = match Provider::infer(&model) {
            Provider::Ollama => None,
            Provider::OpenAICompatible => std::env::var("OPENAI_API_KEY").ok(),
        };
        Self {
            model,
            base_url,
            api_key,
            temperature: None,
            max_tokens: None,
            timeout: None,
            max_retries: 2,
        }
    }

    /// Provider family for this model.
    pub fn provider(&self) -> Provider {
        Provider::infer(&self.model)
    }

    /// Endpoint base URL with the provider default applied.
    ///
    /// An Ollama base URL without the `/v1` segment gets it appended, so the
    /// common `http://localhost:11434` config value works unchanged.
    pub fn api_base_url(&self) -> String {
        match self.provider() {
            Provider::Ollama => {
                let base = self
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
                let trimmed = base.trim_end_matches('/');
                if trimmed.ends_with("/v1") {
                    trimmed.to_string()
                } else {
                    format!("{}/v1", trimmed)
                }
            }
            Provider::OpenAICompatible => self
                .base_url
                .clone()
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        }
    }

    /// Model id as sent on the wire, provider prefix stripped.
    pub fn request_model(&self) -> &str {
        for prefix in ["ollama/", "openai/"] {
            if let Some(stripped) = self.model.strip_prefix(prefix) {
                return stripped;
            }
        }
        &self.model
    }

    /// Request timeout: config, then environment, then the 600s default.
    pub fn request_timeout(&self) -> Duration {
        if let Some(secs) = self.timeout {
            return Duration::from_secs_f64(secs);
        }
        Duration::from_secs(env_secs(REQUEST_TIMEOUT_ENV, DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Connect timeout: environment, then the 30s default.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(env_secs(CONNECT_TIMEOUT_ENV, DEFAULT_CONNECT_TIMEOUT_SECS))
    }

    /// Build the `chat/completions` request body.
    pub fn build_request_body(&self, messages: &[LLMMessage]) -> Value {
        let mut body = serde_json::json!({
            "model": self.request_model(),
            "messages": messages,
            "stream": false,
        });
        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    /// Synchronous chat call, run on a dedicated runtime.
    pub fn call(&self, messages: &[LLMMessage]) -> Result<String, LlmError> {
        log::debug!(
            "LLM.call: model={}, messages={}",
            self.model,
            messages.len()
        );
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.acall(messages))
    }

    /// Async chat call with bounded retry.
    ///
    /// 429 and 5xx responses retry with a doubling delay; 4xx fails
    /// immediately with the response body in the error.
    pub async fn acall(&self, messages: &[LLMMessage]) -> Result<String, LlmError> {
        if self.provider() == Provider::OpenAICompatible && self.api_key.is_none() {
            return Err(LlmError::MissingApiKey(format!(
                "model '{}' needs OPENAI_API_KEY in the environment",
                self.model
            )));
        }

        let body = self.build_request_body(messages);
        let endpoint = format!("{}/chat/completions", self.api_base_url());

        let client = reqwest::Client::builder()
            .timeout(self.request_timeout())
            .connect_timeout(self.connect_timeout())
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let mut last_error: Option<LlmError> = None;
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("LLM retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let mut request = client
                .post(&endpoint)
                .header("Content-Type", "application/json");
            if let Some(ref key) = self.api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }

            let response = match request.json(&body).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(LlmError::Request(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                last_error = Some(LlmError::Request("rate limited (429)".to_string()));
                continue;
            }
            if status.is_server_error() {
                last_error = Some(LlmError::Request(format!("server error: {}", status)));
                continue;
            }

            let response_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = Some(LlmError::Request(e.to_string()));
                    continue;
                }
            };

            if status.is_client_error() {
                return Err(LlmError::Request(format!(
                    "API error ({}): {}",
                    status, response_text
                )));
            }

            return extract_content(&response_text);
        }

        Err(last_error
            .unwrap_or_else(|| LlmError::Request("call failed after all retries".to_string())))
    }
}

impl ChatModel for LLM {
    fn chat(&self, messages: &[LLMMessage]) -> Result<String, LlmError> {
        self.call(messages)
    }
}

/// Pull `choices[0].message.content` out of a response body.
fn extract_content(response_text: &str) -> Result<String, LlmError> {
    let response_json: Value = serde_json::from_str(response_text).map_err(|e| {
        LlmError::MalformedResponse(format!(
            "{} - body: {}",
            e,
            &response_text[..response_text.len().min(500)]
        ))
    })?;

    if let Some(usage) = response_json.get("usage") {
        log::debug!(
            "token usage: prompt={}, completion={}, total={}",
            usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
        );
    }

    response_json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            LlmError::MalformedResponse("no choices[0].message.content in response".to_string())
        })
}

fn env_secs(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
