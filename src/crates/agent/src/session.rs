//! Session state
//!
//! One `SessionContext` per query, passed explicitly to every tool (no
//! process-wide mutable state). The cancellation flag is a watch channel
//! so spawned subprocesses can observe it mid-flight; the event channel
//! feeds the session's SSE stream and is never shared between sessions.

use crate::events::AgentEvent;
use crate::library::CodeLibrary;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, watch, Mutex};
use tooling::async_utils::timeout::Budgets;

/// Per-session limits
#[derive(Debug, Clone)]
pub struct SessionLimits {
    /// Ceiling on total tool invocations
    pub max_tool_calls: usize,

    /// Failures before a tool's circuit breaker opens
    pub breaker_threshold: usize,

    /// Operation time budgets
    pub budgets: Budgets,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_tool_calls: 25,
            breaker_threshold: 3,
            budgets: Budgets::default(),
        }
    }
}

/// State carried through one agent session
pub struct SessionContext {
    /// Opaque process identifier handed to the client
    pub process_id: String,

    /// The user's natural-language question
    pub query: String,

    /// Tenant identifier
    pub tenant_id: String,

    /// Per-session limits
    pub limits: SessionLimits,

    /// The session's code library
    pub library: Mutex<CodeLibrary>,

    /// Serializes probe executions within the session (cap of 1)
    pub probe_slot: Mutex<()>,

    cancel_tx: watch::Sender<bool>,
    cancel_rx: watch::Receiver<bool>,
    events: mpsc::Sender<AgentEvent>,
    tool_calls: AtomicUsize,
}

impl SessionContext {
    /// Create a session and the receiving half of its event channel
    pub fn new(
        process_id: impl Into<String>,
        query: impl Into<String>,
        tenant_id: impl Into<String>,
        limits: SessionLimits,
    ) -> (Self, mpsc::Receiver<AgentEvent>) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (events, event_rx) = mpsc::channel(256);
        let process_id = process_id.into();

        let session = Self {
            library: Mutex::new(CodeLibrary::new(process_id.clone())),
            process_id,
            query: query.into(),
            tenant_id: tenant_id.into(),
            limits,
            probe_slot: Mutex::new(()),
            cancel_tx,
            cancel_rx,
            events,
            tool_calls: AtomicUsize::new(0),
        };
        (session, event_rx)
    }

    /// Set the cancellation flag; spawned subprocesses observe it too
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// A receiver a subprocess can watch
    pub fn cancel_receiver(&self) -> watch::Receiver<bool> {
        self.cancel_rx.clone()
    }

    /// Emit an event into the session's stream. Drops the event if the
    /// stream side has gone away; the agent keeps running regardless (a
    /// dropped TCP connection does not cancel a session).
    pub async fn emit(&self, event: AgentEvent) {
        if self.events.send(event).await.is_err() {
            tracing::debug!(process_id = %self.process_id, "event receiver gone; event dropped");
        }
    }

    /// Count a tool invocation; true while within the allowance
    pub fn count_tool_call(&self) -> bool {
        let used = self.tool_calls.fetch_add(1, Ordering::SeqCst) + 1;
        used <= self.limits.max_tool_calls
    }

    /// Tool invocations so far
    pub fn tool_calls_used(&self) -> usize {
        self.tool_calls.load(Ordering::SeqCst)
    }
}
