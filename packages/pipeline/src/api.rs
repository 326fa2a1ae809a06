use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::models::{ContentSource, ProcessingStatus, StoredAnalysis};
use crate::pipeline::DocumentPipeline;

const UNTITLED: &str = "Untitled contract";

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DocumentPipeline>,
}

#[derive(Deserialize)]
pub struct CreateDocument {
    #[serde(default)]
    pub title: String,
    pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadQuery {
    pub title: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    pub document_id: Uuid,
    pub status: ProcessingStatus,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub document_id: Uuid,
    pub status: ProcessingStatus,
    pub detail: Option<serde_json::Value>,
    pub updated_at: DateTime<Utc>,
}

/// Build the HTTP router for submitting and polling documents.
pub fn router(state: AppState) -> Router {
    let upload_limit = state.pipeline.config().max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/documents", post(create_document))
        .route(
            "/documents/upload",
            post(upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/documents/{id}/status", get(document_status))
        .route("/documents/{id}/analysis", get(document_analysis))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

pub async fn create_document(
    State(state): State<AppState>,
    Json(body): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Accepted>), StatusCode> {
    if body.text.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    accept(&state, ContentSource::Text(body.text), body.title).await
}

pub async fn upload_document(
    State(state): State<AppState>,
    Query(params): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<Accepted>), StatusCode> {
    if body.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let file_name = params.file_name.unwrap_or_else(|| "upload".to_string());
    let title = params.title.unwrap_or_else(|| file_name.clone());
    let source = ContentSource::Bytes {
        data: body.to_vec(),
        file_name,
    };
    accept(&state, source, title).await
}

async fn accept(
    state: &AppState,
    source: ContentSource,
    title: String,
) -> Result<(StatusCode, Json<Accepted>), StatusCode> {
    let title = match title.trim() {
        "" => UNTITLED.to_string(),
        t => t.to_string(),
    };
    let document_id = Uuid::new_v4();

    state.pipeline.register(document_id).await.map_err(|e| {
        tracing::error!(%document_id, error = %e, "failed to register document");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    state
        .pipeline
        .submit(document_id, source, title)
        .await
        .map_err(|e| {
            tracing::error!(%document_id, error = %e, "failed to submit document");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Accepted {
            document_id,
            status: ProcessingStatus::Processing,
        }),
    ))
}

pub async fn document_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let record = state
        .pipeline
        .status(id)
        .await
        .map_err(|e| {
            tracing::error!(document_id = %id, error = %e, "status lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(StatusResponse {
        document_id: record.document_id,
        status: record.status,
        detail: record.detail,
        updated_at: record.updated_at,
    }))
}

pub async fn document_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredAnalysis>, StatusCode> {
    state
        .pipeline
        .analysis(id)
        .await
        .map_err(|e| {
            tracing::error!(document_id = %id, error = %e, "analysis lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
