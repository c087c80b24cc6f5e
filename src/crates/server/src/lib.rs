//! HTTP surface and SSE streaming fabric
//!
//! Routes: `/react/*` for the agent flow, the legacy `/realtime/*`
//! aliases, `/sync/*` for the snapshot writer, `/auth/*` for session
//! cookies, and `/health`. Every endpoint except `/health` and
//! `/auth/login` requires an authenticated session cookie.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod sessions;
pub mod sse;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
