//! Request handlers

pub mod health;
pub mod react;
pub mod sync;

pub use health::health;
pub use react::{cancel, cancel_by_path, start, stream, stream_by_path};
pub use sync::{sync_cancel, sync_start, sync_status};
