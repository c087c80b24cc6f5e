//! The sync service
//!
//! Phases run in dependency order (teams, applications, people with their
//! edges and factors) so every edge lands after both endpoints. Progress
//! lands in the metadata store at the fixed checkpoints 33/66/90/100; the
//! cancellation flag is observed between phases.

use crate::mapper;
use crate::source::TenantSource;
use graphstore::{GraphError, PromotionReport, SnapshotStore};
use metadata::repositories::{SyncPatch, SyncRepository};
use metadata::{Database, DatabaseError, SyncKind, SyncStatus};
use std::sync::Arc;
use tokio::sync::watch;

/// Sync failure modes
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another sync is already running for this tenant
    #[error("a sync is already running for tenant {0}")]
    AlreadyRunning(String),

    /// The sync observed the cancellation flag and stopped
    #[error("sync canceled")]
    Canceled,

    /// Upstream fetch failure
    #[error("upstream failure: {0}")]
    Upstream(#[from] okta_client::OktaError),

    /// Snapshot engine failure
    #[error("snapshot engine failure: {0}")]
    Graph(#[from] GraphError),

    /// Metadata store failure
    #[error("metadata failure: {0}")]
    Db(#[from] DatabaseError),
}

/// What a completed sync produced
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Metadata row id
    pub sync_id: i64,

    /// The promoted snapshot version
    pub version: u64,

    /// Per-label counts
    pub counts: graphstore::LabelCounts,
}

/// The snapshot sync writer service
pub struct SyncService<S: TenantSource> {
    source: S,
    store: Arc<SnapshotStore>,
    db: Database,
    tenant_id: String,
}

impl<S: TenantSource> SyncService<S> {
    /// Create a service for one tenant
    pub fn new(source: S, store: Arc<SnapshotStore>, db: Database, tenant_id: impl Into<String>) -> Self {
        Self {
            source,
            store,
            db,
            tenant_id: tenant_id.into(),
        }
    }

    /// Run a full snapshot sync: fetch, stage, validate, promote.
    ///
    /// On failure the staging directory is aborted (or retained when only
    /// promotion validation failed) and the metadata row records the
    /// terminal status.
    pub async fn run(&self, cancel: watch::Receiver<bool>) -> Result<SyncOutcome, SyncError> {
        if SyncRepository::get_active(self.db.pool(), &self.tenant_id)
            .await?
            .is_some()
        {
            return Err(SyncError::AlreadyRunning(self.tenant_id.clone()));
        }

        let sync_id =
            SyncRepository::create_sync(self.db.pool(), &self.tenant_id, SyncKind::Snapshot).await?;
        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                process_id: Some(uuid::Uuid::new_v4().to_string()),
                ..Default::default()
            },
        )
        .await?;

        match self.run_phases(sync_id, &cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                let status = if matches!(error, SyncError::Canceled) {
                    SyncStatus::Canceled
                } else {
                    SyncStatus::Failed
                };
                let patch = SyncPatch {
                    status: Some(status),
                    error: (!matches!(error, SyncError::Canceled))
                        .then(|| error.to_string()),
                    ..Default::default()
                };
                let _ = SyncRepository::update_sync(self.db.pool(), sync_id, patch).await;
                Err(error)
            }
        }
    }

    async fn run_phases(
        &self,
        sync_id: i64,
        cancel: &watch::Receiver<bool>,
    ) -> Result<SyncOutcome, SyncError> {
        let mut writer = self.store.begin_staging()?;
        let version = writer.version();
        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                snapshot_version: Some(version as i64),
                ..Default::default()
            },
        )
        .await?;

        let outcome = self
            .load_tenant(sync_id, cancel, &mut writer)
            .await;

        match outcome {
            Ok(()) => {}
            Err(error) => {
                // Writer failure deletes the staging directory
                let _ = writer.abort();
                return Err(error);
            }
        }

        let counts = writer.counts();
        writer.finish()?;

        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                status: Some(SyncStatus::Completed),
                percent_complete: Some(100),
                people_count: Some(counts.people as i64),
                teams_count: Some(counts.teams as i64),
                apps_count: Some(counts.applications as i64),
                factors_count: Some(counts.factors as i64),
                ..Default::default()
            },
        )
        .await?;

        // Promotion validates against the metadata row just written
        let record = SyncRepository::get_by_id(self.db.pool(), sync_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("sync {}", sync_id)))?;
        let report = PromotionReport {
            success: record.status == SyncStatus::Completed.as_str(),
            counts,
            ended_at: record.ended_at.clone(),
        };
        self.store.promote(version, &report)?;

        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                promoted: Some(true),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(sync_id, version, "snapshot sync completed and promoted");
        Ok(SyncOutcome {
            sync_id,
            version,
            counts,
        })
    }

    async fn load_tenant(
        &self,
        sync_id: i64,
        cancel: &watch::Receiver<bool>,
        writer: &mut graphstore::SnapshotWriter,
    ) -> Result<(), SyncError> {
        // Phase 1: teams
        check_cancel(cancel)?;
        let teams = self.source.teams().await?;
        for team in &teams {
            if let Some(node) = mapper::team_node(team) {
                writer.upsert_node("Team", node)?;
            }
        }
        let teams_count = writer.counts().teams as i64;
        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                percent_complete: Some(33),
                teams_count: Some(teams_count),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!(sync_id, teams = teams_count, "teams phase complete");

        // Phase 2: applications and team-scoped assignments
        check_cancel(cancel)?;
        for app in self.source.applications().await? {
            if let Some(node) = mapper::application_node(&app) {
                writer.upsert_node("Application", node)?;
            }
        }
        for team in &teams {
            let Some(team_id) = team["id"].as_str() else {
                continue;
            };
            for app in self.source.team_apps(team_id).await? {
                if let Some(node) = mapper::application_node(&app) {
                    let app_id = node.external_id.clone();
                    writer.upsert_node("Application", node)?;
                    writer.add_edge("GROUP_HAS_ACCESS", team_id, &app_id)?;
                }
            }
        }
        let apps_count = writer.counts().applications as i64;
        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                percent_complete: Some(66),
                apps_count: Some(apps_count),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!(sync_id, apps = apps_count, "applications phase complete");

        // Phase 3: people, memberships, factors, direct assignments
        check_cancel(cancel)?;
        let people = self.source.people().await?;

        // Additive DDL for tenant-defined attributes before loading
        for user in &people {
            for key in mapper::custom_attribute_keys(user) {
                if let Err(error) = writer.add_person_attribute(&key) {
                    tracing::warn!(%key, %error, "skipping unusable custom attribute");
                }
            }
        }

        for user in &people {
            let Some(node) = mapper::person_node(user) else {
                continue;
            };
            let person_id = node.external_id.clone();
            writer.upsert_node("Person", node)?;

            for team in self.source.person_teams(&person_id).await? {
                if let Some(team_id) = team["id"].as_str() {
                    // Built-in groups are not synced as teams; skip edges
                    // whose team endpoint is absent
                    if writer.add_edge("MEMBER_OF", &person_id, team_id).is_err() {
                        tracing::debug!(person = %person_id, team = %team_id, "skipped membership to unsynced group");
                    }
                }
            }

            for factor in self.source.person_factors(&person_id).await? {
                if let Some(node) = mapper::factor_node(&factor) {
                    let factor_id = node.external_id.clone();
                    writer.upsert_node("Factor", node)?;
                    writer.add_edge("ENROLLED", &person_id, &factor_id)?;
                }
            }
        }

        // Direct assignments come from each application's user list
        let app_ids: Vec<String> = self
            .source
            .applications()
            .await?
            .iter()
            .filter_map(|app| app["id"].as_str().map(String::from))
            .collect();
        for app_id in app_ids {
            check_cancel(cancel)?;
            for assignment in self.source.application_users(&app_id).await? {
                let direct = assignment["scope"].as_str() == Some("USER");
                if let (true, Some(user_id)) = (direct, assignment["id"].as_str()) {
                    if writer.add_edge("HAS_ACCESS", user_id, &app_id).is_err() {
                        tracing::debug!(user = %user_id, app = %app_id, "skipped assignment for unsynced user");
                    }
                }
            }
        }

        let people_count = writer.counts().people as i64;
        let factors_count = writer.counts().factors as i64;
        SyncRepository::update_sync(
            self.db.pool(),
            sync_id,
            SyncPatch {
                percent_complete: Some(90),
                people_count: Some(people_count),
                factors_count: Some(factors_count),
                ..Default::default()
            },
        )
        .await?;
        tracing::info!(sync_id, people = people_count, "people phase complete");

        Ok(())
    }
}

fn check_cancel(cancel: &watch::Receiver<bool>) -> Result<(), SyncError> {
    if *cancel.borrow() {
        Err(SyncError::Canceled)
    } else {
        Ok(())
    }
}
