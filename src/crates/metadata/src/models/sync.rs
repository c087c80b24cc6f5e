//! Sync invocation rows
//!
//! One row per sync run. Progress percentages advance at fixed checkpoints:
//! teams 33, apps 66, people 90, final validation 100.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What kind of sync produced a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Versioned snapshot build
    Snapshot,
    /// Legacy direct-to-store sync
    Legacy,
}

impl SyncKind {
    /// Column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Snapshot => "snapshot",
            SyncKind::Legacy => "legacy",
        }
    }
}

/// Sync lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Running,
    Completed,
    Failed,
    Canceled,
}

impl SyncStatus {
    /// Column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Canceled => "canceled",
        }
    }

    /// Parse the column representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(SyncStatus::Running),
            "completed" => Some(SyncStatus::Completed),
            "failed" => Some(SyncStatus::Failed),
            "canceled" => Some(SyncStatus::Canceled),
            _ => None,
        }
    }
}

/// One sync invocation
///
/// Timestamps are RFC3339 strings (SQLite TEXT columns).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SyncRecord {
    /// Row id
    pub id: i64,

    /// Tenant the sync belongs to
    pub tenant_id: String,

    /// `snapshot` or `legacy`
    pub kind: String,

    /// `running`, `completed`, `failed`, `canceled`
    pub status: String,

    /// Start timestamp
    pub started_at: String,

    /// End timestamp, present once terminal
    pub ended_at: Option<String>,

    /// Entity counts per label
    pub people_count: i64,
    pub teams_count: i64,
    pub apps_count: i64,
    pub factors_count: i64,

    /// Integer percent complete (0-100)
    pub percent_complete: i64,

    /// Process identifier used for cancellation
    pub process_id: Option<String>,

    /// Snapshot version being built
    pub snapshot_version: Option<i64>,

    /// Whether the built version was promoted
    pub promoted: bool,

    /// Failure detail when status is `failed`
    pub error: Option<String>,
}

impl SyncRecord {
    /// Whether the row represents a sync still in flight
    pub fn is_active(&self) -> bool {
        self.status == SyncStatus::Running.as_str()
    }

    /// Whether promotion validation would accept this row: completed
    /// successfully, all label counts positive, end time present.
    pub fn is_promotable(&self) -> bool {
        self.status == SyncStatus::Completed.as_str()
            && self.ended_at.is_some()
            && self.people_count > 0
            && self.teams_count > 0
            && self.apps_count > 0
            && self.factors_count > 0
    }
}
