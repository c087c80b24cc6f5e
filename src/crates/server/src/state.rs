//! Shared application state

use crate::config::ServerConfig;
use crate::sessions::SessionManager;
use graphstore::SnapshotStore;
use metadata::Database;
use okta_client::OktaClient;
use std::sync::Arc;
use sync::{OktaSource, SyncService};
use tokio::sync::{watch, Mutex};

/// Controls the single sync writer for this process
pub struct SyncCoordinator {
    db: Database,
    store: Arc<SnapshotStore>,
    client: Option<OktaClient>,
    tenant_id: String,
    cancel: Mutex<Option<watch::Sender<bool>>>,
}

impl SyncCoordinator {
    /// Create a coordinator; `client` is None when upstream credentials
    /// are absent (sync endpoints then answer 503).
    pub fn new(
        db: Database,
        store: Arc<SnapshotStore>,
        client: Option<OktaClient>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            db,
            store,
            client,
            tenant_id: tenant_id.into(),
            cancel: Mutex::new(None),
        }
    }

    /// Launch a background snapshot sync. Errors when no client is
    /// configured; duplicate-run protection lives in the sync service.
    pub async fn start(&self) -> Result<(), crate::ApiError> {
        let client = self
            .client
            .clone()
            .ok_or_else(|| crate::ApiError::Unavailable("upstream credentials not configured".to_string()))?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.cancel.lock().await = Some(cancel_tx);

        let service = SyncService::new(
            OktaSource::new(client),
            self.store.clone(),
            self.db.clone(),
            self.tenant_id.clone(),
        );
        tokio::spawn(async move {
            match service.run(cancel_rx).await {
                Ok(outcome) => {
                    tracing::info!(version = outcome.version, "background sync promoted")
                }
                Err(error) => tracing::warn!(%error, "background sync ended without promotion"),
            }
        });
        Ok(())
    }

    /// Flip the cancellation flag of the running sync, if any
    pub async fn cancel(&self) -> bool {
        match self.cancel.lock().await.as_ref() {
            Some(tx) => tx.send(true).is_ok(),
            None => false,
        }
    }
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub db: Database,
    pub store: Arc<SnapshotStore>,
    pub sessions: Arc<SessionManager>,
    pub sync: Arc<SyncCoordinator>,
}
