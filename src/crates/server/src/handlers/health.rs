//! Liveness probe
//!
//! Returns 200 once the snapshot store has opened (with or without a
//! promoted version); `mode` tells clients whether graph queries will
//! work.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    match state.store.current_version() {
        Some(version) => Json(json!({
            "status": "ok",
            "mode": "snapshot",
            "snapshot_version": version,
        })),
        None => Json(json!({
            "status": "ok",
            "mode": "no-snapshot",
            "snapshot_version": null,
        })),
    }
}
