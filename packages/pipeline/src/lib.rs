pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod extraction;
pub mod models;
pub mod pipeline;
pub mod store;

pub use analysis::{Analysis, AnalysisPatch, AnthropicClient, LlmClient, ModelInvoker};
pub use config::PipelineConfig;
pub use error::PipelineError;
pub use extraction::{ExtractedText, PlainTextExtractor, TextExtractor};
pub use models::{
    AnalysisSource, ContentSource, FailureDetail, PipelineStep, ProcessingStatus, RunReport,
    StatusRecord, StoredAnalysis,
};
pub use pipeline::DocumentPipeline;
pub use store::{AnalysisStore, MemoryStore, StatusStore};
