//! Browser session repository
//!
//! Also stores persisted Code Libraries: a suspended query writes its
//! serialized state into the session's `state` blob keyed by query id.

use crate::connection::DatabasePool;
use crate::error::DbResult;
use crate::models::SessionRecord;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Repository for sessions
pub struct SessionRepository;

impl SessionRepository {
    /// Create a session for a user, valid for `ttl_secs`
    pub async fn create(
        pool: &DatabasePool,
        user_id: &str,
        ttl_secs: i64,
    ) -> DbResult<SessionRecord> {
        let now = Utc::now();
        let session = sqlx::query_as::<_, SessionRecord>(
            "INSERT INTO sessions (id, user_id, created_at, expires_at)
             VALUES (?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind((now + Duration::seconds(ttl_secs)).to_rfc3339())
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Get a session if it exists and has not expired
    pub async fn get_valid(pool: &DatabasePool, id: &str) -> DbResult<Option<SessionRecord>> {
        let session = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        let now = Utc::now().to_rfc3339();
        Ok(session.filter(|s| s.is_valid_at(&now)))
    }

    /// Delete a session (logout)
    pub async fn delete(pool: &DatabasePool, id: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Store an opaque JSON state blob on a session
    pub async fn set_state(pool: &DatabasePool, id: &str, state: &str) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET state = ? WHERE id = ?")
            .bind(state)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Read back a session's state blob
    pub async fn get_state(pool: &DatabasePool, id: &str) -> DbResult<Option<String>> {
        let session = sqlx::query_as::<_, SessionRecord>("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(session.and_then(|s| s.state))
    }
}
