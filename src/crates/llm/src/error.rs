//! LLM provider error types

use thiserror::Error;

/// Errors from LLM providers
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider rejected the credentials
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Provider asked us to back off
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Transport failure
    #[error("http error: {0}")]
    Http(String),

    /// Provider returned a body we could not interpret
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Provider-side failure (5xx, overloaded)
    #[error("provider error: {0}")]
    Provider(String),

    /// Request exceeded the call budget
    #[error("llm call timed out after {0} seconds")]
    Timeout(u64),

    /// Configuration failure
    #[error("llm configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether the agent loop should treat this as recoverable
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited(_) | LlmError::Provider(_) | LlmError::Http(_) | LlmError::Timeout(_)
        )
    }
}

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;
