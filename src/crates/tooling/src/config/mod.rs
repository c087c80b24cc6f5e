//! Environment variable loading helpers
//!
//! Credentials and endpoints are read from the environment at startup; the
//! subprocess executor re-exports only an explicit subset of these.

use crate::{Result, ToolingError};

/// Read a required environment variable
pub fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| ToolingError::Config(format!("{} must be set", name)))
        .and_then(|v| {
            if v.trim().is_empty() {
                Err(ToolingError::Config(format!("{} must not be empty", name)))
            } else {
                Ok(v)
            }
        })
}

/// Read an optional environment variable
pub fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read an optional environment variable with a fallback
pub fn or_default(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

/// Read an optional numeric environment variable
pub fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    optional(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
