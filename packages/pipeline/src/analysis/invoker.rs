use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::analysis::client::{LlmClient, LlmRequest};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Backoff schedule for rate-limited calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.retry_base_delay,
            max_jitter: config.retry_max_jitter,
        }
    }

    /// Deterministic part of the delay before retrying after `attempt`
    /// (zero-based): `base_delay * 2^attempt`.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        self.backoff_for(attempt) + jitter
    }
}

/// Calls the model backend with bounded retry on rate limiting.
pub struct ModelInvoker {
    backend: Option<Arc<dyn LlmClient>>,
    policy: RetryPolicy,
    max_tokens: u32,
    temperature: f64,
}

impl ModelInvoker {
    pub fn new(backend: Option<Arc<dyn LlmClient>>, config: &PipelineConfig) -> Self {
        Self {
            backend,
            policy: RetryPolicy::from_config(config),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Send one prompt and return the raw reply text.
    ///
    /// Rate limiting is retried up to `max_retries` times. Any other backend
    /// failure is returned immediately as `LlmTransport`.
    pub async fn invoke(&self, system: &str, prompt: &str) -> Result<String> {
        let Some(backend) = &self.backend else {
            return Err(PipelineError::NoCredentials);
        };

        let request = LlmRequest::single_turn(system, prompt, self.max_tokens, self.temperature);
        let max_attempts = self.policy.max_retries + 1;
        let mut attempt: u32 = 0;

        loop {
            match backend.complete(&request).await {
                Ok(response) => {
                    if response.content.trim().is_empty() {
                        warn!(attempt, "LLM returned empty response");
                        return Err(PipelineError::LlmEmptyResponse);
                    }
                    debug!(
                        attempt,
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "model call succeeded"
                    );
                    return Ok(response.content);
                }
                Err(e) if e.is_rate_limited() => {
                    if attempt + 1 >= max_attempts {
                        warn!(attempts = max_attempts, "LLM rate limit retries exhausted");
                        return Err(PipelineError::LlmRateLimited {
                            attempts: max_attempts,
                            retry_after_secs: None,
                        });
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "LLM rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(PipelineError::LlmEmptyResponse) => {
                    return Err(PipelineError::LlmEmptyResponse);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "LLM call failed");
                    return Err(PipelineError::LlmTransport(e.to_string()));
                }
            }
        }
    }
}
