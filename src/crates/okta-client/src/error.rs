//! Upstream client error types

use thiserror::Error;

/// Errors from the upstream management API
#[derive(Debug, Error)]
pub enum OktaError {
    /// 429 from the org; `retry_after_secs` comes from the Retry-After header
    #[error("rate limited by upstream (retry after {retry_after_secs}s)")]
    RateLimited {
        /// Seconds the server asked us to wait
        retry_after_secs: u64,
    },

    /// Non-success HTTP status
    #[error("upstream returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// Connection or transport failure
    #[error("upstream request failed: {0}")]
    Network(String),

    /// Response body did not decode as JSON
    #[error("upstream response decode failed: {0}")]
    Decode(String),

    /// Client construction or configuration failure
    #[error("client configuration error: {0}")]
    Config(String),
}

impl OktaError {
    /// Whether a retry could plausibly succeed (rate limit or 5xx)
    pub fn is_transient(&self) -> bool {
        match self {
            OktaError::RateLimited { .. } => true,
            OktaError::Http { status, .. } => *status >= 500,
            OktaError::Network(_) => true,
            _ => false,
        }
    }

    /// Explicit wait requested by the server, if any
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            OktaError::RateLimited { retry_after_secs } => {
                Some(std::time::Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}

/// Result type for upstream operations
pub type Result<T> = std::result::Result<T, OktaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(OktaError::RateLimited { retry_after_secs: 5 }.is_transient());
        assert!(OktaError::Http { status: 503, body: String::new() }.is_transient());
        assert!(OktaError::Network("reset".to_string()).is_transient());
        assert!(!OktaError::Http { status: 404, body: String::new() }.is_transient());
        assert!(!OktaError::Decode("bad json".to_string()).is_transient());
    }

    #[test]
    fn retry_after_only_for_rate_limit() {
        let err = OktaError::RateLimited { retry_after_secs: 30 };
        assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));
        assert!(OktaError::Network("x".to_string()).retry_after().is_none());
    }
}
