//! HTTP surface (spec §6.1-§6.2): upload submission plus the
//! management endpoints for cascading delete and status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use ingest_pipeline::VideoSubmission;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::context::AppContext;
use crate::error::ApiError;

/// Build the full router over one shared [`AppContext`].
pub fn build_router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/uploads", post(submit_uploads))
        .route("/management/videos/:video_id", delete(delete_video))
        .route("/management/videos/:video_id/stages/:artifact_type", delete(delete_stage))
        .route("/management/videos/:video_id/status", get(get_status))
        .with_state(context)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// One file in an upload submission (spec §6.1).
#[derive(Debug, Deserialize)]
struct UploadFile {
    video_id: String,
    video_blob_url: String,
}

/// `POST /uploads` request body (spec §6.1).
#[derive(Debug, Deserialize)]
struct UploadRequest {
    user_id: String,
    files: Vec<UploadFile>,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    run_id: String,
    flow_run_id: String,
    video_count: usize,
    video_names: Vec<String>,
    status: &'static str,
    message: String,
    tracking_url: String,
}

/// Accept a batch of videos and kick off ingestion in the background,
/// returning immediately (spec §6.1: `202 Accepted`, `status: "RUNNING"`).
/// Each video's own progress is then visible at its own status endpoint
/// — the spec has no separate run-tracking endpoint, so `tracking_url`
/// points at the first video's status route.
async fn submit_uploads(
    State(context): State<Arc<AppContext>>,
    Json(request): Json<UploadRequest>,
) -> impl IntoResponse {
    let run_id = uuid::Uuid::new_v4().to_string();
    let flow_run_id = uuid::Uuid::new_v4().to_string();
    let video_count = request.files.len();
    let video_names: Vec<String> = request.files.iter().map(|f| f.video_id.clone()).collect();
    let tracking_url = video_names
        .first()
        .map(|id| format!("/management/videos/{id}/status"))
        .unwrap_or_default();

    for file in request.files {
        let context = context.clone();
        let user_bucket = request.user_id.clone();
        let video_id = file.video_id.clone();
        tokio::spawn(async move {
            let submission = VideoSubmission {
                video_id: video_id.clone(),
                user_bucket,
                blob_url: file.video_blob_url,
            };
            match context.orchestrator.run_video(submission).await {
                Ok(events) => info!(video_id, stages = events.len(), "ingestion run completed"),
                Err(e) => error!(video_id, error = %e, "ingestion run failed"),
            }
        });
    }

    let response = UploadResponse {
        run_id: run_id.clone(),
        flow_run_id,
        video_count,
        video_names,
        status: "RUNNING",
        message: format!("Accepted {video_count} video(s) for ingestion"),
        tracking_url,
    };
    (StatusCode::ACCEPTED, Json(response))
}

/// `DELETE /management/videos/{video_id}` (spec §6.2).
async fn delete_video(
    State(context): State<Arc<AppContext>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match context.deleter.delete_video_cascade(&video_id).await? {
        Some(report) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": report.errors.is_empty(),
                "video_id": video_id,
                "metadata": report,
            })),
        )),
        None => Err(ApiError::from(ingest_error::IngestError::new(
            ingest_error::IngestErrorKind::Database(ingest_error::DatabaseError::new(
                ingest_error::DatabaseErrorKind::NotFound,
            )),
        ))),
    }
}

/// `DELETE /management/videos/{video_id}/stages/{artifact_type}` (spec §6.2).
async fn delete_stage(
    State(context): State<Arc<AppContext>>,
    Path((video_id, artifact_type)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    match context.deleter.delete_stage_artifacts(&video_id, &artifact_type).await? {
        Some(report) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": report.errors.is_empty(),
                "video_id": video_id,
                "metadata": report,
            })),
        )),
        None => Err(ApiError::from(ingest_error::IngestError::new(
            ingest_error::IngestErrorKind::Database(ingest_error::DatabaseError::new(
                ingest_error::DatabaseErrorKind::NotFound,
            )),
        ))),
    }
}

/// `GET /management/videos/{video_id}/status` (spec §6.2).
async fn get_status(
    State(context): State<Arc<AppContext>>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match context.status.get_status(&video_id).await? {
        Some(status) => Ok((StatusCode::OK, Json(status))),
        None => Err(ApiError::from(ingest_error::IngestError::new(
            ingest_error::IngestErrorKind::Database(ingest_error::DatabaseError::new(
                ingest_error::DatabaseErrorKind::NotFound,
            )),
        ))),
    }
}
