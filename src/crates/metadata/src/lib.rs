//! Operational metadata store
//!
//! Persists sync history, local users, and browser sessions in SQLite.
//! Deliberately a separate file from the graph snapshots so the sync writer
//! never contends with snapshot readers.

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use error::{DatabaseError, DbResult};
pub use models::{LocalUser, SessionRecord, SyncKind, SyncRecord, SyncStatus};
pub use repositories::{SessionRepository, SyncPatch, SyncRepository, UserRepository};
