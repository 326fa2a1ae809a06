use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::analysis::{Analysis, AnalysisPatch};
use crate::error::{PipelineError, Result};
use crate::models::{ProcessingStatus, StatusRecord, StoredAnalysis};

/// Persistence for analysis records.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Store a new analysis for a document and return its id.
    async fn save(&self, document_id: Uuid, analysis: &Analysis) -> Result<Uuid>;

    /// Apply `patch` to the stored record and write the result back.
    async fn update(&self, analysis_id: Uuid, patch: AnalysisPatch) -> Result<Analysis>;

    async fn delete(&self, analysis_id: Uuid) -> Result<()>;

    /// Latest analysis stored for a document.
    async fn get(&self, document_id: Uuid) -> Result<Option<StoredAnalysis>>;
}

/// Per-document processing status.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn set_status(
        &self,
        document_id: Uuid,
        status: ProcessingStatus,
        detail: Option<serde_json::Value>,
    ) -> Result<()>;

    async fn get_status(&self, document_id: Uuid) -> Result<Option<StatusRecord>>;
}

/// In-process store backing both traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    analyses: RwLock<HashMap<Uuid, StoredAnalysis>>,
    statuses: RwLock<HashMap<Uuid, StatusRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save(&self, document_id: Uuid, analysis: &Analysis) -> Result<Uuid> {
        let now = Utc::now();
        let stored = StoredAnalysis {
            id: Uuid::new_v4(),
            document_id,
            analysis: analysis.clone(),
            created_at: now,
            updated_at: now,
        };
        let id = stored.id;
        self.analyses.write().await.insert(id, stored);
        Ok(id)
    }

    async fn update(&self, analysis_id: Uuid, patch: AnalysisPatch) -> Result<Analysis> {
        let mut analyses = self.analyses.write().await;
        let stored = analyses
            .get_mut(&analysis_id)
            .ok_or(PipelineError::AnalysisNotFound(analysis_id))?;
        stored.analysis = stored.analysis.apply(patch);
        stored.updated_at = Utc::now();
        Ok(stored.analysis.clone())
    }

    async fn delete(&self, analysis_id: Uuid) -> Result<()> {
        self.analyses
            .write()
            .await
            .remove(&analysis_id)
            .map(|_| ())
            .ok_or(PipelineError::AnalysisNotFound(analysis_id))
    }

    async fn get(&self, document_id: Uuid) -> Result<Option<StoredAnalysis>> {
        let analyses = self.analyses.read().await;
        Ok(analyses
            .values()
            .filter(|a| a.document_id == document_id)
            .max_by_key(|a| a.created_at)
            .cloned())
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn set_status(
        &self,
        document_id: Uuid,
        status: ProcessingStatus,
        detail: Option<serde_json::Value>,
    ) -> Result<()> {
        let record = StatusRecord {
            document_id,
            status,
            detail,
            updated_at: Utc::now(),
        };
        self.statuses.write().await.insert(document_id, record);
        Ok(())
    }

    async fn get_status(&self, document_id: Uuid) -> Result<Option<StatusRecord>> {
        Ok(self.statuses.read().await.get(&document_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{fallback, RiskLevel};

    fn sample() -> Analysis {
        fallback::analyze("The payment is due on delivery.", "Sample", false)
    }

    #[tokio::test]
    async fn test_save_then_get_by_document() {
        let store = MemoryStore::new();
        let document_id = Uuid::new_v4();
        let id = store.save(document_id, &sample()).await.unwrap();

        let stored = store.get(document_id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.analysis, sample());
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let store = MemoryStore::new();
        let document_id = Uuid::new_v4();
        let id = store.save(document_id, &sample()).await.unwrap();

        let patch = AnalysisPatch {
            overall_risk: Some(RiskLevel::High),
            summary: Some("Reviewed by counsel".into()),
            ..Default::default()
        };
        let updated = store.update(id, patch).await.unwrap();
        assert_eq!(updated.overall_risk, RiskLevel::High);

        let stored = store.get(document_id).await.unwrap().unwrap();
        assert_eq!(stored.analysis.summary, "Reviewed by counsel");
        assert_eq!(stored.analysis.clauses, sample().clauses);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let store = MemoryStore::new();
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.update(missing, AnalysisPatch::default()).await,
            Err(PipelineError::AnalysisNotFound(id)) if id == missing
        ));
        assert!(matches!(
            store.delete(missing).await,
            Err(PipelineError::AnalysisNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MemoryStore::new();
        let document_id = Uuid::new_v4();
        let id = store.save(document_id, &sample()).await.unwrap();
        store.delete(id).await.unwrap();
        assert!(store.get(document_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_read_after_write() {
        let store = MemoryStore::new();
        let document_id = Uuid::new_v4();
        assert!(store.get_status(document_id).await.unwrap().is_none());

        store
            .set_status(document_id, ProcessingStatus::Processing, None)
            .await
            .unwrap();
        store
            .set_status(
                document_id,
                ProcessingStatus::Failed,
                Some(serde_json::json!({"step": "persist"})),
            )
            .await
            .unwrap();

        let record = store.get_status(document_id).await.unwrap().unwrap();
        assert_eq!(record.status, ProcessingStatus::Failed);
        assert_eq!(record.detail.unwrap()["step"], "persist");
    }
}
