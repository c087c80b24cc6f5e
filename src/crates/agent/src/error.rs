//! Agent error taxonomy
//!
//! The runtime distinguishes recoverable tool failures (the model sees
//! guidance and chooses its next action) from session-fatal conditions
//! (an ERROR event ends the stream).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a tool or session failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Graph query rejected by the safety filter
    UnsafeQuery,
    /// Probe program rejected by static validation
    UnsafeProgram,
    /// Structured output or tool arguments violated their schema
    ValidationFailed,
    /// Rate limit or 5xx from upstream; retry plausible
    TransientUpstream,
    /// Query named a nonexistent attribute
    InvalidAttribute,
    /// Probe named a nonexistent or disallowed endpoint
    InvalidEndpoint,
    /// A tool exceeded its time budget
    Timeout,
    /// The session spent its tool-invocation allowance
    UsageLimitExceeded,
    /// The tool's circuit breaker is open for the rest of the session
    CircuitOpen,
    /// The session was cancelled
    Cancelled,
    /// Parser failure or internal bug
    Unrecoverable,
}

impl ToolErrorKind {
    /// Wire representation used in events and tool results
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::UnsafeQuery => "unsafe_query",
            ToolErrorKind::UnsafeProgram => "unsafe_program",
            ToolErrorKind::ValidationFailed => "validation_failed",
            ToolErrorKind::TransientUpstream => "transient_upstream",
            ToolErrorKind::InvalidAttribute => "invalid_attribute",
            ToolErrorKind::InvalidEndpoint => "invalid_endpoint",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::UsageLimitExceeded => "usage_limit_exceeded",
            ToolErrorKind::CircuitOpen => "circuit_open",
            ToolErrorKind::Cancelled => "cancelled",
            ToolErrorKind::Unrecoverable => "unrecoverable",
        }
    }

    /// Whether the agent loop may continue after this failure
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ToolErrorKind::UsageLimitExceeded
                | ToolErrorKind::Cancelled
                | ToolErrorKind::Unrecoverable
        )
    }
}

/// Session-level errors
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model provider failed beyond retry
    #[error("llm failure: {0}")]
    Llm(String),

    /// The model never produced a schema-valid terminal payload
    #[error("structured output failed validation after {attempts} attempts: {detail}")]
    OutputValidation { attempts: usize, detail: String },

    /// The session exceeded its wall-clock budget
    #[error("session exceeded its {0}s wall-clock budget")]
    WallClock(u64),

    /// A duplicate step id was appended to the code library
    #[error("duplicate step id: {0}")]
    DuplicateStep(String),

    /// A write script referenced a read result that does not exist
    #[error("unknown read result in depends_on: {0}")]
    UnknownDependency(String),

    /// Library persistence failure
    #[error("code library persistence failed: {0}")]
    Persistence(String),
}
