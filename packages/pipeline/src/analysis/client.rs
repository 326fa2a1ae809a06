use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// One model call: a system prompt and the conversation so far.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl LlmRequest {
    /// A request with a single user turn.
    pub fn single_turn(
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
        temperature: f64,
    ) -> Self {
        Self {
            system: system.into(),
            messages: vec![Message {
                role: Role::User,
                content: user.into(),
            }],
            max_tokens,
            temperature,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A model backend. Implementations make exactly one attempt per call;
/// retrying is the invoker's job.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Anthropic Messages API backend.
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct AnthropicErrorResponse {
    error: Option<AnthropicErrorDetail>,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

impl AnthropicClient {
    /// Build a client from the pipeline config. Returns `Ok(None)` when no
    /// API key is configured.
    pub fn from_config(config: &PipelineConfig) -> Result<Option<Self>> {
        match &config.api_key {
            Some(api_key) => Self::new(api_key, config).map(Some),
            None => Ok(None),
        }
    }

    pub fn new(api_key: impl Into<String>, config: &PipelineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::LlmApiRequest)?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/messages", self.api_base_url);

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
        };

        debug!(model = %self.model, "sending model request");

        let resp = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();

        if status == 429 {
            let retry_after_secs = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            warn!(?retry_after_secs, "LLM rate limited");
            return Err(PipelineError::LlmRateLimited {
                attempts: 1,
                retry_after_secs,
            });
        }

        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicErrorResponse>(&body_text)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body_text);
            return Err(PipelineError::LlmApiError { status, message });
        }

        let api_response: AnthropicResponse = resp.json().await?;

        let content = api_response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse {
            content,
            input_tokens: api_response.usage.input_tokens,
            output_tokens: api_response.usage.output_tokens,
        })
    }
}

/// Test utilities for the model backend.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted backend. Returns the configured results in order, then
    /// keeps repeating the fallback result.
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<LlmResponse>>>,
        exhausted: fn() -> Result<LlmResponse>,
        calls: AtomicUsize,
        last_request: Mutex<Option<LlmRequest>>,
    }

    fn empty_response() -> Result<LlmResponse> {
        Err(PipelineError::LlmEmptyResponse)
    }

    fn rate_limited() -> Result<LlmResponse> {
        Err(PipelineError::LlmRateLimited {
            attempts: 1,
            retry_after_secs: None,
        })
    }

    fn transport_failure() -> Result<LlmResponse> {
        Err(PipelineError::LlmApiError {
            status: 500,
            message: "backend unavailable".into(),
        })
    }

    pub fn text_response(content: &str) -> LlmResponse {
        LlmResponse {
            content: content.to_string(),
            input_tokens: 100,
            output_tokens: 200,
        }
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<LlmResponse>>) -> Self {
            // Reverse so we can pop from the end
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                exhausted: empty_response,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }
        }

        pub fn with_response(content: &str) -> Self {
            Self::new(vec![Ok(text_response(content))])
        }

        /// A backend that rate limits every call.
        pub fn always_rate_limited() -> Self {
            Self {
                exhausted: rate_limited,
                ..Self::new(Vec::new())
            }
        }

        /// A backend whose every call fails with a non-rate-limit error.
        pub fn always_failing() -> Self {
            Self {
                exhausted: transport_failure,
                ..Self::new(Vec::new())
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_request(&self) -> Option<LlmRequest> {
            self.last_request.lock().ok().and_then(|r| r.clone())
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_request.lock() {
                *last = Some(request.clone());
            }
            let mut responses = self.responses.lock().map_err(|e| {
                PipelineError::LlmTransport(format!("mock lock poisoned: {e}"))
            })?;
            responses.pop().unwrap_or_else(self.exhausted)
        }
    }
}
