use std::time::Duration;

const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

/// Upper bound on the random jitter added to rate-limit backoff.
pub const MAX_JITTER: Duration = Duration::from_secs(1);

/// Configuration for the analysis pipeline.
///
/// `api_key` is optional: without it the model backend is disabled and every
/// run is served by the heuristic analyzer.
#[derive(Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base_url: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_jitter: Duration,
    pub max_contract_chars: usize,
    pub max_upload_bytes: usize,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("retry_max_jitter", &self.retry_max_jitter)
            .field("max_contract_chars", &self.max_contract_chars)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// Never fails: a missing `ANTHROPIC_API_KEY` is a supported mode.
    pub fn from_env() -> Self {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());

        let api_base_url =
            std::env::var("LLM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());

        let max_tokens = env_parse("LLM_MAX_TOKENS").unwrap_or(8000);
        let temperature = env_parse("LLM_TEMPERATURE").unwrap_or(0.3);
        let timeout_secs = env_parse("LLM_TIMEOUT_SECS").unwrap_or(120);
        let max_retries = env_parse("LLM_MAX_RETRIES").unwrap_or(2);

        let retry_base_delay_ms: u64 = env_parse("LLM_RETRY_BASE_DELAY_MS").unwrap_or(1000);
        let retry_max_jitter_ms: u64 = env_parse("LLM_RETRY_MAX_JITTER_MS").unwrap_or(1000);

        let max_contract_chars = env_parse("ANALYSIS_MAX_CONTRACT_CHARS").unwrap_or(50_000);
        let max_upload_bytes = env_parse("ANALYSIS_MAX_UPLOAD_BYTES").unwrap_or(10 * 1024 * 1024);

        Self {
            api_key,
            model,
            api_base_url,
            max_tokens,
            temperature,
            timeout_secs,
            max_retries,
            retry_base_delay: Duration::from_millis(retry_base_delay_ms),
            retry_max_jitter: Duration::from_millis(retry_max_jitter_ms).min(MAX_JITTER),
            max_contract_chars,
            max_upload_bytes,
        }
    }

    /// Create a config builder, mainly for tests.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self {
                api_key: None,
                model: DEFAULT_MODEL.into(),
                api_base_url: DEFAULT_API_BASE_URL.into(),
                max_tokens: 8000,
                temperature: 0.3,
                timeout_secs: 120,
                max_retries: 2,
                retry_base_delay: Duration::from_secs(1),
                retry_max_jitter: MAX_JITTER,
                max_contract_chars: 50_000,
                max_upload_bytes: 10 * 1024 * 1024,
            },
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for constructing `PipelineConfig` in tests.
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.config.api_base_url = api_base_url.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    pub fn retry_max_jitter(mut self, jitter: Duration) -> Self {
        self.config.retry_max_jitter = jitter.min(MAX_JITTER);
        self
    }

    pub fn max_contract_chars(mut self, max_contract_chars: usize) -> Self {
        self.config.max_contract_chars = max_contract_chars;
        self
    }

    pub fn max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.config.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.config
    }
}
