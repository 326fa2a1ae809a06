#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use contractlens_pipeline::analysis::{Analysis, AnalysisPatch, LlmClient, MockLlmClient};
use contractlens_pipeline::error::{PipelineError, Result};
use contractlens_pipeline::{
    AnalysisStore, DocumentPipeline, MemoryStore, PipelineConfig, PlainTextExtractor,
    ProcessingStatus, StatusRecord, StatusStore, StoredAnalysis,
};

pub const INDEMNITY_TEXT: &str =
    "This agreement includes an indemnification clause and payment terms of net 60.";

/// Config with retries that never sleep.
pub fn test_config() -> PipelineConfig {
    PipelineConfig::builder()
        .retry_base_delay(Duration::ZERO)
        .retry_max_jitter(Duration::ZERO)
        .build()
}

/// A model reply in the shape the prompt asks for.
pub fn model_reply_json() -> serde_json::Value {
    serde_json::json!({
        "contractType": "service",
        "overallRisk": "high",
        "riskScore": 90,
        "summary": "One-sided service agreement with uncapped liability.",
        "riskMetrics": [
            { "category": "liability", "score": 90 },
            { "category": "payment", "score": 40 }
        ],
        "clauses": [
            {
                "title": "Unlimited liability",
                "riskLevel": "high",
                "category": "liability",
                "page": 2,
                "clauseText": "The provider is liable for all losses.",
                "explanation": "There is no cap on what you may owe.",
                "impact": "A single claim could exceed the contract value.",
                "suggestions": ["Cap liability at the annual fee"]
            }
        ]
    })
}

pub fn pipeline_with(
    config: PipelineConfig,
    backend: Option<Arc<dyn LlmClient>>,
    analyses: Arc<dyn AnalysisStore>,
    statuses: Arc<dyn StatusStore>,
) -> DocumentPipeline {
    DocumentPipeline::new(
        config,
        backend,
        Arc::new(PlainTextExtractor),
        analyses,
        statuses,
    )
}

/// Pipeline over a fresh memory store, returning both.
pub fn memory_pipeline(backend: Option<Arc<MockLlmClient>>) -> (DocumentPipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let backend = backend.map(|b| b as Arc<dyn LlmClient>);
    let pipeline = pipeline_with(test_config(), backend, store.clone(), store.clone());
    (pipeline, store)
}

/// Poll until the document reaches a terminal status.
pub async fn wait_for_terminal(store: &dyn StatusStore, document_id: Uuid) -> StatusRecord {
    for _ in 0..200 {
        if let Some(record) = store.get_status(document_id).await.expect("status lookup") {
            if record.status.is_terminal() {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("document {document_id} never reached a terminal status");
}

/// Analysis store whose writes always fail.
#[derive(Default)]
pub struct FailingAnalysisStore {
    pub save_calls: AtomicUsize,
}

#[async_trait]
impl AnalysisStore for FailingAnalysisStore {
    async fn save(&self, _document_id: Uuid, _analysis: &Analysis) -> Result<Uuid> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::storage("save", "database unavailable"))
    }

    async fn update(&self, _analysis_id: Uuid, _patch: AnalysisPatch) -> Result<Analysis> {
        Err(PipelineError::storage("update", "database unavailable"))
    }

    async fn delete(&self, _analysis_id: Uuid) -> Result<()> {
        Err(PipelineError::storage("delete", "database unavailable"))
    }

    async fn get(&self, _document_id: Uuid) -> Result<Option<StoredAnalysis>> {
        Ok(None)
    }
}

/// Status store that rejects writes of one particular status and records
/// everything else in an inner memory store.
pub struct RejectingStatusStore {
    pub inner: MemoryStore,
    pub reject: Vec<ProcessingStatus>,
}

impl RejectingStatusStore {
    pub fn rejecting(reject: Vec<ProcessingStatus>) -> Self {
        Self {
            inner: MemoryStore::new(),
            reject,
        }
    }
}

#[async_trait]
impl StatusStore for RejectingStatusStore {
    async fn set_status(
        &self,
        document_id: Uuid,
        status: ProcessingStatus,
        detail: Option<serde_json::Value>,
    ) -> Result<()> {
        if self.reject.contains(&status) {
            return Err(PipelineError::storage("set_status", "status table locked"));
        }
        self.inner.set_status(document_id, status, detail).await
    }

    async fn get_status(&self, document_id: Uuid) -> Result<Option<StatusRecord>> {
        self.inner.get_status(document_id).await
    }
}
