//! Snapshot engine and query errors

use thiserror::Error;

/// Errors from the snapshot engine and query path
#[derive(Debug, Error)]
pub enum GraphError {
    /// The query contains a mutating keyword and was rejected pre-parse
    #[error("unsafe query: {0}")]
    UnsafeQuery(String),

    /// A projected or filtered attribute does not exist on the label
    #[error("unknown attribute '{token}' on label {label}")]
    InvalidAttribute {
        /// The offending attribute token
        token: String,
        /// The label it was addressed on
        label: String,
    },

    /// An unknown node label was named
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// An unknown relationship was named
    #[error("unknown relationship: {0}")]
    UnknownRelationship(String),

    /// The query text failed to parse
    #[error("query parse error: {0}")]
    Parse(String),

    /// An edge endpoint is absent from the staging version
    #[error("dangling edge: {rel} references missing {label} '{id}'")]
    DanglingEdge {
        rel: String,
        label: String,
        id: String,
    },

    /// A second writer tried to attach
    #[error("a writer is already attached to a staging version")]
    WriterConflict,

    /// Promotion validation failed
    #[error("version {version} is not promotable: {reason}")]
    NotPromotable { version: u64, reason: String },

    /// No snapshot has been promoted yet
    #[error("no snapshot version is available")]
    NoSnapshot,

    /// On-disk payload did not decode
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    /// Filesystem failure
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for snapshot engine operations
pub type Result<T> = std::result::Result<T, GraphError>;
