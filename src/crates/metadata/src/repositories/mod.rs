//! Repositories for metadata store operations

pub mod session_repo;
pub mod sync_repo;
pub mod user_repo;

pub use session_repo::SessionRepository;
pub use sync_repo::{SyncPatch, SyncRepository};
pub use user_repo::UserRepository;
