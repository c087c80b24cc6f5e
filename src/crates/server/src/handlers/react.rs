//! Agent flow handlers
//!
//! `POST /react/start` returns a process id without blocking on the LLM;
//! the client then opens the SSE stream. The legacy `/realtime/*` routes
//! carry the same semantics with path-style parameters.

use crate::error::{ApiError, ApiResult};
use crate::sse;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use metadata::repositories::SyncRepository;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub process_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    pub process_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub process_id: String,
}

/// POST /react/start
pub async fn start(
    State(state): State<AppState>,
    Json(request): Json<StartRequest>,
) -> ApiResult<Json<StartResponse>> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let last_sync_time = SyncRepository::get_last_completed(state.db.pool(), &state.config.tenant_id)
        .await?
        .and_then(|record| record.ended_at);

    let process_id = state.sessions.start(request.query, last_sync_time);
    Ok(Json(StartResponse { process_id }))
}

/// GET /react/stream?process_id=...
pub async fn stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> ApiResult<impl IntoResponse> {
    open_stream(&state, &params.process_id).await
}

/// POST /react/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    cancel_process(&state, &request.process_id)
}

/// POST /realtime/start-process (legacy alias)
pub use start as start_process;

/// GET /realtime/stream/:id (legacy alias)
pub async fn stream_by_path(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    open_stream(&state, &process_id).await
}

/// POST /realtime/cancel/:id (legacy alias)
pub async fn cancel_by_path(
    State(state): State<AppState>,
    Path(process_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    cancel_process(&state, &process_id)
}

async fn open_stream(state: &AppState, process_id: &str) -> ApiResult<impl IntoResponse> {
    let rx = state
        .sessions
        .take_stream(process_id)
        .await
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no pending stream for process {}; it may already be attached",
                process_id
            ))
        })?;
    Ok(sse::stream_events(rx, state.config.batch_size))
}

fn cancel_process(state: &AppState, process_id: &str) -> ApiResult<Json<serde_json::Value>> {
    if state.sessions.cancel(process_id) {
        Ok(Json(serde_json::json!({"success": true})))
    } else {
        Err(ApiError::NotFound(format!("unknown process {}", process_id)))
    }
}
