use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::analysis::Analysis;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Where the contract text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// A raw upload that still needs text extraction.
    Bytes { data: Vec<u8>, file_name: String },
    /// Pasted text, used as-is.
    Text(String),
}

/// Pipeline step that failed a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PipelineStep {
    Extract,
    Analyze,
    Persist,
    Status,
}

/// Attached to a `failed` status so pollers can see what went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub step: PipelineStep,
    pub message: String,
}

impl FailureDetail {
    pub fn new(step: PipelineStep, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "step": self.step, "message": self.message })
    }
}

/// Latest status written for a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub document_id: Uuid,
    pub status: ProcessingStatus,
    pub detail: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// An analysis as held by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub document_id: Uuid,
    pub analysis: Analysis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which analyzer produced the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AnalysisSource {
    Model,
    Fallback {
        quota_exceeded: bool,
        reason: String,
    },
}

impl AnalysisSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

/// Outcome of a foreground pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub document_id: Uuid,
    pub status: ProcessingStatus,
    pub analysis_id: Uuid,
    pub source: AnalysisSource,
    pub page_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_wire_names() {
        assert_eq!(ProcessingStatus::Processing.to_string(), "processing");
        assert_eq!(
            serde_json::to_value(ProcessingStatus::Failed).unwrap(),
            "failed"
        );
        assert_eq!(
            ProcessingStatus::from_str("completed").unwrap(),
            ProcessingStatus::Completed
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ProcessingStatus::Pending.is_terminal());
        assert!(!ProcessingStatus::Processing.is_terminal());
        assert!(ProcessingStatus::Completed.is_terminal());
        assert!(ProcessingStatus::Failed.is_terminal());
    }

    #[test]
    fn test_failure_detail_json() {
        let detail = FailureDetail::new(PipelineStep::Persist, "disk full");
        assert_eq!(
            detail.to_json(),
            serde_json::json!({ "step": "persist", "message": "disk full" })
        );
    }

    #[test]
    fn test_analysis_source_serialization() {
        let source = AnalysisSource::Fallback {
            quota_exceeded: true,
            reason: "rate limited".into(),
        };
        let value = serde_json::to_value(&source).unwrap();
        assert_eq!(value["kind"], "fallback");
        assert_eq!(value["quota_exceeded"], true);
        assert!(source.is_fallback());
        assert!(!AnalysisSource::Model.is_fallback());
    }
}
