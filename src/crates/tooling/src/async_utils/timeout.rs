//! Timeout budgets for the session's suspension points
//!
//! Every await in a session (LLM call, graph query, subprocess, whole
//! session) runs under one of these budgets.

use crate::{Result, ToolingError};
use std::future::Future;
use std::time::Duration;

/// Per-operation time budgets, in seconds
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Budgets {
    /// LLM request budget
    pub llm_secs: u64,

    /// Graph query budget
    pub graph_query_secs: u64,

    /// Probe subprocess budget
    pub subprocess_secs: u64,

    /// Whole-session wall clock budget
    pub session_secs: u64,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            llm_secs: 60,
            graph_query_secs: 60,
            subprocess_secs: 180,
            session_secs: 600,
        }
    }
}

/// Run `future` under a budget of `secs` seconds
pub async fn with_budget<T>(secs: u64, future: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(Duration::from_secs(secs), future)
        .await
        .map_err(|_| ToolingError::Timeout(secs))
}
