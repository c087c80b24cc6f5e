//! Local user repository

use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DbResult};
use crate::models::LocalUser;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use uuid::Uuid;

/// Repository for local users
pub struct UserRepository;

impl UserRepository {
    /// Create a user with an argon2-hashed password
    pub async fn create(
        pool: &DatabasePool,
        username: &str,
        email: &str,
        password: &str,
    ) -> DbResult<LocalUser> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DatabaseError::PasswordHash(e.to_string()))?
            .to_string();

        let now = Utc::now().to_rfc3339();
        let user = sqlx::query_as::<_, LocalUser>(
            "INSERT INTO users (id, username, email, password_hash, active, created_at, updated_at)
             VALUES (?, ?, ?, ?, 1, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(username)
        .bind(email)
        .bind(&hash)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Get a user by username
    pub async fn get_by_username(
        pool: &DatabasePool,
        username: &str,
    ) -> DbResult<Option<LocalUser>> {
        let user = sqlx::query_as::<_, LocalUser>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Verify a password attempt against a stored hash
    ///
    /// Returns `Ok(false)` for a wrong password; errors only on malformed
    /// stored hashes.
    pub fn verify_password(user: &LocalUser, attempt: &str) -> DbResult<bool> {
        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| DatabaseError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(attempt.as_bytes(), &parsed)
            .is_ok())
    }

    /// Deactivate a user
    pub async fn deactivate(pool: &DatabasePool, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET active = 0, updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    #[tokio::test]
    async fn create_hashes_password() {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::create(db.pool(), "alice", "alice@example.com", "s3cret")
            .await
            .unwrap();

        assert_ne!(user.password_hash, "s3cret");
        assert!(user.active);
        assert!(UserRepository::verify_password(&user, "s3cret").unwrap());
        assert!(!UserRepository::verify_password(&user, "wrong").unwrap());
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let db = Database::open_in_memory().await.unwrap();
        UserRepository::create(db.pool(), "alice", "a@example.com", "pw")
            .await
            .unwrap();

        let err = UserRepository::create(db.pool(), "alice", "b@example.com", "pw")
            .await
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[tokio::test]
    async fn deactivate_clears_active_flag() {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::create(db.pool(), "bob", "bob@example.com", "pw")
            .await
            .unwrap();

        UserRepository::deactivate(db.pool(), &user.id).await.unwrap();
        let reloaded = UserRepository::get_by_username(db.pool(), "bob")
            .await
            .unwrap()
            .unwrap();
        assert!(!reloaded.active);
    }
}
