mod client;
pub mod fallback;
mod invoker;
mod parser;
mod prompt;
pub mod sanitizer;
mod types;

pub use client::{AnthropicClient, LlmClient, LlmRequest, LlmResponse, Message, Role};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::{text_response, MockLlmClient};
pub use invoker::{ModelInvoker, RetryPolicy};
pub use parser::parse_analysis;
pub use prompt::{build_analysis_prompt, build_system_prompt, truncate_chars};
pub use sanitizer::sanitize;
pub use types::{
    complexity_from_text, AlertIcon, AlertSeverity, Analysis, AnalysisPatch, AnalysisRequest,
    Clause, ContractType, FinancialExposure, Importance, NegotiationPoint, Obligation,
    ObligationCategory, Perspective, Priority, RiskAlert, RiskCategory, RiskLevel, RiskMetric,
    RoleAnalysis,
};
