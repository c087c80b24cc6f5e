//! Ambient utilities shared across the idlens workspace
//!
//! # Modules
//!
//! - `async_utils` - Retry policies and timeout budgets for async operations
//! - `rate_limit` - Token bucket limiter for upstream call pacing
//! - `logging` - Tracing subscriber initialization
//! - `config` - Environment variable loading helpers

pub mod async_utils;
pub mod config;
pub mod logging;
pub mod rate_limit;

use thiserror::Error;

/// Errors that can occur in the tooling crate
#[derive(Debug, Error)]
pub enum ToolingError {
    /// A required environment variable was absent or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// An operation exceeded its time budget
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),
}

/// Result type for tooling operations
pub type Result<T> = std::result::Result<T, ToolingError>;
