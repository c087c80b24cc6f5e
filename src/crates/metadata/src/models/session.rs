//! Browser session rows

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cookie-backed browser session
///
/// The `state` blob holds a persisted Code Library when a query is suspended
/// pending approval; it is opaque JSON to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    /// Opaque session identifier (UUID string)
    pub id: String,

    /// Owning user
    pub user_id: String,

    /// Creation timestamp (RFC3339)
    pub created_at: String,

    /// Expiry timestamp (RFC3339)
    pub expires_at: String,

    /// Optional JSON blob
    pub state: Option<String>,
}

impl SessionRecord {
    /// Whether the session is still valid at `now` (RFC3339)
    pub fn is_valid_at(&self, now: &str) -> bool {
        self.expires_at.as_str() > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_compares_rfc3339_lexicographically() {
        let session = SessionRecord {
            id: "s1".to_string(),
            user_id: "u1".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            expires_at: "2026-01-02T00:00:00Z".to_string(),
            state: None,
        };

        assert!(session.is_valid_at("2026-01-01T12:00:00Z"));
        assert!(!session.is_valid_at("2026-01-03T00:00:00Z"));
    }
}
