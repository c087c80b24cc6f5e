//! Session manager
//!
//! Tracks running agent sessions by process id. Each session owns its
//! event channel; the stream endpoint takes the receiving half exactly
//! once. A dropped stream does not cancel the session; only the cancel
//! endpoint does.

use agent::{AgentEvent, AgentRunner, RunnerConfig, SessionContext, SessionLimits};
use agent::tools::build_registry;
use dashmap::DashMap;
use graphstore::SnapshotStore;
use llm::ChatModel;
use sandbox::ProbeExecutor;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// One tracked session
pub struct SessionHandle {
    /// The session context (for cancellation)
    pub session: Arc<SessionContext>,

    /// Receiving half of the event channel, taken once by the stream
    events: Mutex<Option<mpsc::Receiver<AgentEvent>>>,
}

/// Tracks all live sessions in this process
pub struct SessionManager {
    model: Arc<dyn ChatModel>,
    store: Arc<SnapshotStore>,
    executor: Arc<ProbeExecutor>,
    limits: SessionLimits,
    tenant_id: String,
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl SessionManager {
    /// Create a manager over the shared engines
    pub fn new(
        model: Arc<dyn ChatModel>,
        store: Arc<SnapshotStore>,
        executor: Arc<ProbeExecutor>,
        limits: SessionLimits,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            model,
            store,
            executor,
            limits,
            tenant_id: tenant_id.into(),
            sessions: DashMap::new(),
        }
    }

    /// Start a session for a query; returns the process id immediately
    /// while the agent runs in the background.
    pub fn start(&self, query: String, last_sync_time: Option<String>) -> String {
        let process_id = Uuid::new_v4().to_string();
        let (session, event_rx) = SessionContext::new(
            process_id.clone(),
            query,
            self.tenant_id.clone(),
            self.limits.clone(),
        );
        let session = Arc::new(session);

        let registry = Arc::new(build_registry(
            self.store.clone(),
            self.executor.clone(),
            self.limits.breaker_threshold,
        ));
        let config = RunnerConfig {
            snapshot_available: self.store.current_version().is_some(),
            last_sync_time,
            ..Default::default()
        };
        let runner = AgentRunner::new(self.model.clone(), registry, config);

        let handle = Arc::new(SessionHandle {
            session: session.clone(),
            events: Mutex::new(Some(event_rx)),
        });
        self.sessions.insert(process_id.clone(), handle);

        tokio::spawn(async move {
            runner.run(session).await;
        });

        tracing::info!(%process_id, "agent session started");
        process_id
    }

    /// Take the event stream for a session (first caller wins)
    pub async fn take_stream(&self, process_id: &str) -> Option<mpsc::Receiver<AgentEvent>> {
        let handle = self.sessions.get(process_id)?.clone();
        let mut slot = handle.events.lock().await;
        slot.take()
    }

    /// Set a session's cancellation flag. Returns false for unknown ids.
    pub fn cancel(&self, process_id: &str) -> bool {
        match self.sessions.get(process_id) {
            Some(handle) => {
                handle.session.cancel();
                tracing::info!(%process_id, "session cancel requested");
                true
            }
            None => false,
        }
    }

    /// Number of tracked sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are tracked
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
