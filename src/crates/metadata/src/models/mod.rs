//! Row models for the metadata store

pub mod session;
pub mod sync;
pub mod user;

pub use session::SessionRecord;
pub use sync::{SyncKind, SyncRecord, SyncStatus};
pub use user::LocalUser;
