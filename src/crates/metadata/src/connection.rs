//! SQLite pool wrapper and migrations

use crate::error::DbResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;

/// Type alias for the metadata connection pool
pub type DatabasePool = SqlitePool;

/// Metadata database handle
///
/// Cheap to clone; all repositories borrow the inner pool.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DatabasePool>,
}

impl Database {
    /// Open (creating if necessary) the metadata store at `path` and run
    /// migrations.
    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool: Arc::new(pool) };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Open an in-memory store (tests)
    pub async fn open_in_memory() -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool: Arc::new(pool) };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Liveness check
    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close the pool gracefully
    pub async fn close(self) {
        self.pool.close().await;
    }
}
