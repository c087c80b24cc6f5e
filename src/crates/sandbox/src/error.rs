//! Sandbox error types

use thiserror::Error;

/// Errors from probe validation and execution
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The program failed static validation
    #[error("unsafe program: {0}")]
    UnsafeProgram(String),

    /// The child exceeded its time budget and was killed
    #[error("probe timed out after {timeout_secs}s")]
    Timeout {
        timeout_secs: u64,
        /// Stdout captured before the kill
        partial_stdout: String,
        /// Stderr captured before the kill
        partial_stderr: String,
    },

    /// The session's cancellation flag fired; the child was killed
    #[error("probe cancelled")]
    Cancelled,

    /// The child could not be spawned
    #[error("probe spawn failed: {0}")]
    Spawn(String),

    /// The child exited nonzero
    #[error("probe exited with status {status}: {stderr}")]
    Failed { status: i32, stderr: String },

    /// Stdout did not contain exactly one JSON document
    #[error("probe output was not a single JSON document: {0}")]
    OutputParse(String),

    /// The global concurrency cap is saturated
    #[error("probe executor is at capacity")]
    Busy,

    /// Scratch directory or pipe failure
    #[error("sandbox io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;
