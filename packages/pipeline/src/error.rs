use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no model credential configured")]
    NoCredentials,

    #[error("LLM API request failed: {0}")]
    LlmApiRequest(#[from] reqwest::Error),

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("LLM rate limited after {attempts} attempt(s)")]
    LlmRateLimited {
        attempts: u32,
        retry_after_secs: Option<u64>,
    },

    #[error("LLM transport error: {0}")]
    LlmTransport(String),

    #[error("LLM returned empty response")]
    LlmEmptyResponse,

    #[error("malformed analysis payload: {0}")]
    MalformedPayload(String),

    #[error("analysis schema violation: {}", errors.join(", "))]
    SchemaViolation { errors: Vec<String> },

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("storage error during {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("analysis not found: {0}")]
    AnalysisNotFound(uuid::Uuid),
}

impl PipelineError {
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the model backend signalled rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::LlmRateLimited { .. } => true,
            Self::LlmApiError { status, .. } => *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
