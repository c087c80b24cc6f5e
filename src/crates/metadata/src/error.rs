//! Database error types

use thiserror::Error;

/// Errors from the metadata store
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection or pool failure
    #[error("database connection failed: {0}")]
    Connection(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),

    /// Unique or foreign key violation
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Migration failure
    #[error("migration failed: {0}")]
    Migration(String),

    /// Query execution or decode failure
    #[error("query error: {0}")]
    Query(String),

    /// Password hashing failure
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

impl DatabaseError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::Constraint(_))
    }
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound("no matching row".to_string())
            }
            sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
                DatabaseError::Constraint(db.to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DatabaseError::Connection(err.to_string())
            }
            sqlx::Error::Migrate(e) => DatabaseError::Migration(e.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::Migration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn display_includes_context() {
        let err = DatabaseError::NotFound("sync id=7".to_string());
        assert!(err.to_string().contains("sync id=7"));
    }
}
