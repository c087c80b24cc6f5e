//! Local user rows

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A local user able to authenticate against the server
///
/// Passwords are stored as argon2 hashes; the plaintext never touches a row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocalUser {
    /// Unique user identifier (UUID string)
    pub id: String,

    /// Login name, unique
    pub username: String,

    /// Contact email
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether the account may log in
    pub active: bool,

    /// Creation timestamp (RFC3339)
    pub created_at: String,

    /// Last update timestamp (RFC3339)
    pub updated_at: String,
}
