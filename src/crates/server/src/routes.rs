//! Route definitions

use crate::auth;
use crate::handlers;
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// `/health` and `/auth/login` are open; everything else sits behind the
/// session-cookie middleware.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        // Agent flow
        .route("/react/start", post(handlers::start))
        .route("/react/stream", get(handlers::stream))
        .route("/react/cancel", post(handlers::cancel))
        // Legacy flow, same semantics
        .route("/realtime/start-process", post(handlers::start))
        .route("/realtime/stream/:id", get(handlers::stream_by_path))
        .route("/realtime/cancel/:id", post(handlers::cancel_by_path))
        // Snapshot sync control
        .route("/sync/status", get(handlers::sync_status))
        .route("/sync/start", post(handlers::sync_start))
        .route("/sync/cancel", post(handlers::sync_cancel))
        // Session teardown
        .route("/auth/logout", post(auth::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
