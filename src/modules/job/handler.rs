use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use super::dto::{TranscodeRequest, TranscodeResponse};
use crate::common::response::{ApiError, ErrorResponse};
use crate::pipeline::error::WorkspaceError;
use crate::pipeline::{orchestrator, workspace};
use crate::state::AppState;

/// Convert an uploaded media file into a streaming-ready package
#[utoipa::path(
    post,
    path = "/api/v1/transcode",
    request_body = TranscodeRequest,
    responses(
        (status = 200, description = "Package ready, job committed", body = TranscodeResponse),
        (status = 400, description = "Missing or malformed jobId / sourceLocator", body = ErrorResponse),
        (status = 409, description = "A pipeline for this jobId is already in flight", body = ErrorResponse),
        (status = 500, description = "A pipeline stage failed; the job is marked failed", body = ErrorResponse)
    ),
    tag = "Transcode"
)]
pub async fn transcode(
    State(state): State<AppState>,
    body: Json<serde_json::Value>,
) -> impl IntoResponse {
    // Deserialize by hand so a missing field is a 400, not axum's 422.
    let request: TranscodeRequest = match serde_json::from_value(body.0) {
        Ok(request) => request,
        Err(e) => return ApiError::bad_request(format!("invalid request body: {e}")).into_response(),
    };

    if !workspace::is_safe_component(&request.job_id) {
        return ApiError::bad_request("jobId must be a non-empty path-safe identifier")
            .into_response();
    }
    if let Err(e) = validate_source_url(&request.source_locator.url) {
        return ApiError::bad_request(e).into_response();
    }

    let workspace = match state.workspaces.allocate(&request.job_id).await {
        Ok(ws) => ws,
        Err(WorkspaceError::AlreadyExists(id)) => {
            return ApiError::conflict(format!("a pipeline for job '{id}' is already in flight"))
                .into_response();
        }
        Err(e) => {
            return ApiError::internal("WorkspaceError", e.to_string()).into_response();
        }
    };

    info!(job_id = %request.job_id, "pipeline accepted");

    match orchestrator::run(&state, workspace, &request.source_locator).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(TranscodeResponse {
                manifest_url: outcome.manifest_url,
                job: outcome.job,
            }),
        )
            .into_response(),
        Err(e) => ApiError::internal(e.kind(), e.detail()).into_response(),
    }
}

fn validate_source_url(raw: &str) -> Result<(), String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("sourceLocator.url is invalid: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("sourceLocator.url has unsupported scheme '{other}'")),
    }
}
