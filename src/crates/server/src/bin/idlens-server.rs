//! Server entry point

use clap::Parser;
use graphstore::SnapshotStore;
use metadata::Database;
use okta_client::{OktaClient, OktaConfig};
use sandbox::{ExecutorConfig, ProbeExecutor};
use server::sessions::SessionManager;
use server::state::{AppState, SyncCoordinator};
use server::{create_router, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "idlens-server", about = "Identity tenant Q&A agent server")]
struct Args {
    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8787")]
    bind: String,

    /// Data directory (snapshots, metadata, logs)
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    data_dir: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tooling::logging::init(&args.log_level);

    let mut config = ServerConfig::from_env();
    config.bind_addr = args.bind.clone();
    config.data_dir = args.data_dir.clone();

    if let Some(parent) = config.metadata_path().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(config.metadata_path()).await?;
    let store = Arc::new(SnapshotStore::open(config.snapshots_dir())?);

    // Upstream credentials are optional at startup; sync and probes need
    // them, graph queries do not.
    let okta = match OktaConfig::from_env() {
        Ok(okta_config) => Some(OktaClient::new(okta_config)?),
        Err(error) => {
            tracing::warn!(%error, "upstream credentials missing; sync and probes disabled");
            None
        }
    };

    let (base_url, api_token) = okta
        .as_ref()
        .map(|client| {
            (
                client.base_url().to_string(),
                std::env::var("OKTA_API_TOKEN").unwrap_or_default(),
            )
        })
        .unwrap_or_default();
    let mut executor_config = ExecutorConfig::new(base_url, api_token);
    executor_config.timeout_secs = config.limits.budgets.subprocess_secs;
    let executor = Arc::new(ProbeExecutor::new(executor_config));

    let model = llm::provider_from_env()?;
    tracing::info!(model = model.model_name(), "llm provider configured");

    let sessions = Arc::new(SessionManager::new(
        model,
        store.clone(),
        executor,
        config.limits.clone(),
        config.tenant_id.clone(),
    ));
    let sync = Arc::new(SyncCoordinator::new(
        db.clone(),
        store.clone(),
        okta,
        config.tenant_id.clone(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        db,
        store,
        sessions,
        sync,
    };

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "idlens server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
