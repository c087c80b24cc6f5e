//! Sync control handlers

use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use metadata::repositories::SyncRepository;
use metadata::SyncRecord;
use serde_json::{json, Value};

fn sync_json(record: &SyncRecord) -> Value {
    json!({
        "id": record.id,
        "kind": record.kind,
        "status": record.status,
        "started_at": record.started_at,
        "ended_at": record.ended_at,
        "percent_complete": record.percent_complete,
        "counts": {
            "people": record.people_count,
            "teams": record.teams_count,
            "applications": record.apps_count,
            "factors": record.factors_count,
        },
        "snapshot_version": record.snapshot_version,
        "promoted": record.promoted,
    })
}

/// GET /sync/status
pub async fn sync_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let tenant = &state.config.tenant_id;

    if let Some(active) = SyncRepository::get_active(state.db.pool(), tenant).await? {
        return Ok(Json(json!({"active": true, "sync": sync_json(&active)})));
    }
    match SyncRepository::get_last_completed(state.db.pool(), tenant).await? {
        Some(last) => Ok(Json(json!({"active": false, "sync": sync_json(&last)}))),
        None => Ok(Json(json!({"active": false, "sync": null}))),
    }
}

/// POST /sync/start
pub async fn sync_start(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<Value>)> {
    state.sync.start().await?;
    Ok((StatusCode::ACCEPTED, Json(json!({"started": true}))))
}

/// POST /sync/cancel
pub async fn sync_cancel(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let canceled = state.sync.cancel().await;
    Ok(Json(json!({"canceled": canceled})))
}
