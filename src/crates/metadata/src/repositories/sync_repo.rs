//! Sync history repository

use crate::connection::DatabasePool;
use crate::error::DbResult;
use crate::models::{SyncKind, SyncRecord, SyncStatus};
use chrono::Utc;

/// Partial update applied to a running sync row
///
/// Only set fields are written. Progress patches land at the fixed
/// checkpoints (teams 33, apps 66, people 90, validation 100).
#[derive(Debug, Default, Clone)]
pub struct SyncPatch {
    pub status: Option<SyncStatus>,
    pub people_count: Option<i64>,
    pub teams_count: Option<i64>,
    pub apps_count: Option<i64>,
    pub factors_count: Option<i64>,
    pub percent_complete: Option<i64>,
    pub process_id: Option<String>,
    pub snapshot_version: Option<i64>,
    pub promoted: Option<bool>,
    pub error: Option<String>,
}

impl SyncPatch {
    /// Patch that only advances the progress percentage
    pub fn progress(percent: i64) -> Self {
        Self {
            percent_complete: Some(percent),
            ..Default::default()
        }
    }

    /// Patch that marks the sync terminal with the given status
    pub fn terminal(status: SyncStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Repository for sync rows
pub struct SyncRepository;

impl SyncRepository {
    /// Create a new running sync row, returning its id
    pub async fn create_sync(
        pool: &DatabasePool,
        tenant_id: &str,
        kind: SyncKind,
    ) -> DbResult<i64> {
        let now = Utc::now().to_rfc3339();
        let record = sqlx::query_as::<_, SyncRecord>(
            "INSERT INTO syncs (tenant_id, kind, status, started_at)
             VALUES (?, ?, ?, ?)
             RETURNING *",
        )
        .bind(tenant_id)
        .bind(kind.as_str())
        .bind(SyncStatus::Running.as_str())
        .bind(&now)
        .fetch_one(pool)
        .await?;

        Ok(record.id)
    }

    /// Apply a patch to a sync row
    ///
    /// A terminal status also stamps `ended_at`.
    pub async fn update_sync(pool: &DatabasePool, id: i64, patch: SyncPatch) -> DbResult<()> {
        let mut sets: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(status) = patch.status {
            sets.push("status = ?".to_string());
            args.push(status.as_str().to_string());
            if status != SyncStatus::Running {
                sets.push("ended_at = ?".to_string());
                args.push(Utc::now().to_rfc3339());
            }
        }
        if let Some(v) = patch.people_count {
            sets.push("people_count = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.teams_count {
            sets.push("teams_count = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.apps_count {
            sets.push("apps_count = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.factors_count {
            sets.push("factors_count = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.percent_complete {
            sets.push("percent_complete = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.process_id {
            sets.push("process_id = ?".to_string());
            args.push(v);
        }
        if let Some(v) = patch.snapshot_version {
            sets.push("snapshot_version = ?".to_string());
            args.push(v.to_string());
        }
        if let Some(v) = patch.promoted {
            sets.push("promoted = ?".to_string());
            args.push(if v { "1" } else { "0" }.to_string());
        }
        if let Some(v) = patch.error {
            sets.push("error = ?".to_string());
            args.push(v);
        }

        if sets.is_empty() {
            return Ok(());
        }

        let sql = format!("UPDATE syncs SET {} WHERE id = ?", sets.join(", "));
        let mut query = sqlx::query(&sql);
        for arg in &args {
            query = query.bind(arg);
        }
        query.bind(id).execute(pool).await?;
        Ok(())
    }

    /// Get a sync row by id
    pub async fn get_by_id(pool: &DatabasePool, id: i64) -> DbResult<Option<SyncRecord>> {
        let record = sqlx::query_as::<_, SyncRecord>("SELECT * FROM syncs WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(record)
    }

    /// Get the currently running sync for a tenant, if any
    pub async fn get_active(pool: &DatabasePool, tenant_id: &str) -> DbResult<Option<SyncRecord>> {
        let record = sqlx::query_as::<_, SyncRecord>(
            "SELECT * FROM syncs WHERE tenant_id = ? AND status = 'running'
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    /// Get the most recent completed sync for a tenant, if any
    pub async fn get_last_completed(
        pool: &DatabasePool,
        tenant_id: &str,
    ) -> DbResult<Option<SyncRecord>> {
        let record = sqlx::query_as::<_, SyncRecord>(
            "SELECT * FROM syncs WHERE tenant_id = ? AND status = 'completed'
             ORDER BY started_at DESC LIMIT 1",
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    /// Get recent sync history for a tenant, newest first
    pub async fn get_history(
        pool: &DatabasePool,
        tenant_id: &str,
        limit: i64,
    ) -> DbResult<Vec<SyncRecord>> {
        let records = sqlx::query_as::<_, SyncRecord>(
            "SELECT * FROM syncs WHERE tenant_id = ?
             ORDER BY started_at DESC LIMIT ?",
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }
}
