//! Snapshot sync writer
//!
//! Pulls teams, applications, people, and factor enrollments from the
//! management API, builds the staging snapshot version, records progress
//! in the metadata store at fixed checkpoints, and promotes on success.

pub mod mapper;
pub mod service;
pub mod source;

pub use service::{SyncError, SyncOutcome, SyncService};
pub use source::{OktaSource, TenantSource};
