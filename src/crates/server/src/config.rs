//! Server configuration

use agent::SessionLimits;
use std::path::PathBuf;

/// Runtime configuration, read from the environment at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Root for `snapshots/`, `metadata/`, and `logs/`
    pub data_dir: PathBuf,

    /// Tenant identifier
    pub tenant_id: String,

    /// Row threshold above which COMPLETE payloads are batched
    pub batch_size: usize,

    /// Session cookie lifetime
    pub session_ttl_secs: i64,

    /// Per-query agent limits
    pub limits: SessionLimits,
}

impl ServerConfig {
    /// Load from the environment with defaults
    pub fn from_env() -> Self {
        let mut limits = SessionLimits::default();
        limits.max_tool_calls = tooling::config::parse_or("AGENT_MAX_TOOL_CALLS", limits.max_tool_calls);
        limits.budgets.subprocess_secs =
            tooling::config::parse_or("PROBE_TIMEOUT_SECS", limits.budgets.subprocess_secs);

        Self {
            bind_addr: tooling::config::or_default("BIND_ADDR", "127.0.0.1:8787"),
            data_dir: PathBuf::from(tooling::config::or_default("DATA_DIR", ".")),
            tenant_id: tooling::config::or_default("TENANT_ID", "default"),
            batch_size: tooling::config::parse_or("RESULT_BATCH_SIZE", 1000),
            session_ttl_secs: tooling::config::parse_or("SESSION_TTL_SECS", 86_400),
            limits,
        }
    }

    /// Snapshot store root
    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    /// Metadata store path
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata").join("ops.db")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            data_dir: PathBuf::from("."),
            tenant_id: "default".to_string(),
            batch_size: 1000,
            session_ttl_secs: 86_400,
            limits: SessionLimits::default(),
        }
    }
}
