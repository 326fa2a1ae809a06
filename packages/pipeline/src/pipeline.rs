//! Per-document orchestration: extract, analyze, persist, report status.
//!
//! Each run moves a document from `processing` to `completed` or `failed`.
//! Model problems never fail a run; they route to the heuristic analyzer.
//! Extraction, persistence and status-store errors are fatal and are
//! recorded on the `failed` status.

use std::sync::Arc;

use uuid::Uuid;

use crate::analysis::{
    build_analysis_prompt, build_system_prompt, fallback, parse_analysis, sanitize, Analysis,
    AnalysisRequest, LlmClient, ModelInvoker,
};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::extraction::{ExtractedText, TextExtractor};
use crate::models::{
    AnalysisSource, ContentSource, FailureDetail, PipelineStep, ProcessingStatus, RunReport,
    StatusRecord, StoredAnalysis,
};
use crate::store::{AnalysisStore, StatusStore};

/// A fatal error tagged with the step it happened in.
struct StepError {
    step: PipelineStep,
    error: PipelineError,
}

impl StepError {
    fn at(step: PipelineStep) -> impl FnOnce(PipelineError) -> StepError {
        move |error| StepError { step, error }
    }
}

pub struct DocumentPipeline {
    config: PipelineConfig,
    invoker: ModelInvoker,
    extractor: Arc<dyn TextExtractor>,
    analyses: Arc<dyn AnalysisStore>,
    statuses: Arc<dyn StatusStore>,
}

impl DocumentPipeline {
    /// `backend` is `None` when no model credential is configured; every run
    /// then uses the heuristic analyzer.
    pub fn new(
        config: PipelineConfig,
        backend: Option<Arc<dyn LlmClient>>,
        extractor: Arc<dyn TextExtractor>,
        analyses: Arc<dyn AnalysisStore>,
        statuses: Arc<dyn StatusStore>,
    ) -> Self {
        let invoker = ModelInvoker::new(backend, &config);
        Self {
            config,
            invoker,
            extractor,
            analyses,
            statuses,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process one document to completion in the foreground.
    pub async fn run(
        &self,
        document_id: Uuid,
        source: ContentSource,
        title: &str,
    ) -> Result<RunReport> {
        self.start(document_id).await?;
        self.process(document_id, source, title).await
    }

    /// Mark the document `processing` and continue in a detached task.
    ///
    /// Returns once the status is written. The outcome is only observable
    /// through the status store.
    pub async fn submit(
        self: &Arc<Self>,
        document_id: Uuid,
        source: ContentSource,
        title: String,
    ) -> Result<()> {
        self.start(document_id).await?;

        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are already recorded on the document status
            let _ = pipeline.process(document_id, source, &title).await;
        });

        Ok(())
    }

    /// Latest status written for a document.
    pub async fn status(&self, document_id: Uuid) -> Result<Option<StatusRecord>> {
        self.statuses.get_status(document_id).await
    }

    /// Stored analysis for a document, if a run completed.
    pub async fn analysis(&self, document_id: Uuid) -> Result<Option<StoredAnalysis>> {
        self.analyses.get(document_id).await
    }

    /// Record a document that exists but has not been picked up yet.
    pub async fn register(&self, document_id: Uuid) -> Result<()> {
        self.statuses
            .set_status(document_id, ProcessingStatus::Pending, None)
            .await
    }

    async fn start(&self, document_id: Uuid) -> Result<()> {
        if let Err(e) = self
            .statuses
            .set_status(document_id, ProcessingStatus::Processing, None)
            .await
        {
            tracing::error!(%document_id, error = %e, "failed to mark document as processing");
            self.mark_failed(document_id, &FailureDetail::new(PipelineStep::Status, e.to_string()))
                .await;
            return Err(e);
        }
        tracing::info!(%document_id, "document processing started");
        Ok(())
    }

    async fn process(
        &self,
        document_id: Uuid,
        source: ContentSource,
        title: &str,
    ) -> Result<RunReport> {
        match self.execute(document_id, source, title).await {
            Ok(report) => Ok(report),
            Err(StepError { step, error }) => {
                tracing::error!(
                    %document_id,
                    step = %step,
                    error = %error,
                    "document processing failed"
                );
                self.mark_failed(document_id, &FailureDetail::new(step, error.to_string()))
                    .await;
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        document_id: Uuid,
        source: ContentSource,
        title: &str,
    ) -> std::result::Result<RunReport, StepError> {
        let extracted = self
            .extract(source)
            .await
            .map_err(StepError::at(PipelineStep::Extract))?;

        tracing::info!(
            %document_id,
            pages = extracted.page_count,
            chars = extracted.text.chars().count(),
            "text extracted"
        );

        let (analysis, source) = self.analyze(document_id, &extracted.text, title).await;
        let analysis = analysis.with_default_complexity(&extracted.text);

        let analysis_id = self
            .analyses
            .save(document_id, &analysis)
            .await
            .map_err(StepError::at(PipelineStep::Persist))?;

        self.statuses
            .set_status(document_id, ProcessingStatus::Completed, None)
            .await
            .map_err(StepError::at(PipelineStep::Status))?;

        tracing::info!(
            %document_id,
            %analysis_id,
            fallback = source.is_fallback(),
            overall_risk = %analysis.overall_risk,
            risk_score = analysis.risk_score,
            "document processing completed"
        );

        Ok(RunReport {
            document_id,
            status: ProcessingStatus::Completed,
            analysis_id,
            source,
            page_count: extracted.page_count,
        })
    }

    async fn extract(&self, source: ContentSource) -> Result<ExtractedText> {
        let extracted = match source {
            ContentSource::Text(text) => ExtractedText {
                text,
                page_count: 1,
            },
            ContentSource::Bytes { data, file_name } => {
                if data.len() > self.config.max_upload_bytes {
                    return Err(PipelineError::Extraction(format!(
                        "{file_name} is {} bytes, the limit is {}",
                        data.len(),
                        self.config.max_upload_bytes
                    )));
                }
                tracing::debug!(file_name = %file_name, bytes = data.len(), "extracting text");
                self.extractor.extract(&data).await?
            }
        };

        if extracted.text.trim().is_empty() {
            return Err(PipelineError::Extraction(
                "no text could be extracted from the document".into(),
            ));
        }
        Ok(extracted)
    }

    /// Model analysis with fallback. Never fails.
    async fn analyze(
        &self,
        document_id: Uuid,
        text: &str,
        title: &str,
    ) -> (Analysis, AnalysisSource) {
        let request = AnalysisRequest::new(text, title);
        let prompt = build_analysis_prompt(&request, self.config.max_contract_chars);

        let (quota_exceeded, reason) =
            match self.invoker.invoke(build_system_prompt(), &prompt).await {
                Ok(raw) => match parse_analysis(&sanitize(&raw)) {
                    Ok(analysis) => return (analysis, AnalysisSource::Model),
                    Err(e) => {
                        tracing::warn!(%document_id, error = %e, "model reply unusable, using fallback");
                        (false, e.to_string())
                    }
                },
                Err(PipelineError::NoCredentials) => {
                    tracing::info!(%document_id, "no model credential configured, using fallback");
                    (false, PipelineError::NoCredentials.to_string())
                }
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!(%document_id, error = %e, "model quota exceeded, using fallback");
                    (true, e.to_string())
                }
                Err(e) => {
                    tracing::warn!(%document_id, error = %e, "model call failed, using fallback");
                    (false, e.to_string())
                }
            };

        (
            fallback::analyze(text, title, quota_exceeded),
            AnalysisSource::Fallback {
                quota_exceeded,
                reason,
            },
        )
    }

    /// Best effort: a failure here is logged and dropped.
    async fn mark_failed(&self, document_id: Uuid, detail: &FailureDetail) {
        if let Err(e) = self
            .statuses
            .set_status(document_id, ProcessingStatus::Failed, Some(detail.to_json()))
            .await
        {
            tracing::error!(%document_id, error = %e, "failed to mark document as failed");
        }
    }
}
