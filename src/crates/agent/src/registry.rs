//! Explicit tool registry with circuit breakers
//!
//! Tools are registered at agent construction; each entry records the
//! tool's definition, retry classification, and breaker state. Dispatch
//! checks cancellation, the usage allowance, and the breaker before the
//! tool runs. Breakers reset only with the session (the registry is built
//! per session).

use crate::error::ToolErrorKind;
use crate::session::SessionContext;
use async_trait::async_trait;
use llm::ToolDefinition;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A tool failure with its classification
#[derive(Debug)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
    /// Server-requested wait for transient failures
    pub wait_hint_secs: Option<u64>,
}

impl ToolFailure {
    /// Shorthand for a failure without a wait hint
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            wait_hint_secs: None,
        }
    }
}

/// What dispatch hands back to the agent loop
#[derive(Debug)]
pub enum ToolOutcome {
    /// The tool ran; its JSON result goes into the conversation
    Success(Value),

    /// Recoverable failure; the guidance text goes into the conversation
    /// and the model decides whether to retry, rephrase, or abandon
    Retry {
        kind: ToolErrorKind,
        guidance: String,
        wait_hint_secs: Option<u64>,
    },

    /// Session-fatal condition
    Fatal { kind: ToolErrorKind, message: String },
}

/// A tool exposed to the model
#[async_trait]
pub trait SessionTool: Send + Sync {
    /// Tool name as the model sees it
    fn name(&self) -> &'static str;

    /// One-line description for the tool definition
    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> Value;

    /// Execute against the session
    async fn execute(
        &self,
        session: &SessionContext,
        args: Value,
    ) -> Result<Value, ToolFailure>;
}

struct ToolEntry {
    tool: Arc<dyn SessionTool>,
    failures: AtomicUsize,
}

/// The per-session tool registry
pub struct ToolRegistry {
    entries: BTreeMap<&'static str, ToolEntry>,
    breaker_threshold: usize,
}

impl ToolRegistry {
    /// Create a registry with the given breaker threshold
    pub fn new(breaker_threshold: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            breaker_threshold,
        }
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn SessionTool>) {
        self.entries.insert(
            tool.name(),
            ToolEntry {
                tool,
                failures: AtomicUsize::new(0),
            },
        );
    }

    /// Tool definitions for the chat request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries
            .values()
            .map(|entry| ToolDefinition {
                name: entry.tool.name().to_string(),
                description: entry.tool.description().to_string(),
                parameters: entry.tool.parameters(),
            })
            .collect()
    }

    /// Whether a tool's breaker is open
    pub fn is_open(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|e| e.failures.load(Ordering::SeqCst) >= self.breaker_threshold)
    }

    /// Dispatch one tool invocation
    pub async fn dispatch(
        &self,
        session: &SessionContext,
        name: &str,
        args: Value,
    ) -> ToolOutcome {
        if session.is_cancelled() {
            return ToolOutcome::Fatal {
                kind: ToolErrorKind::Cancelled,
                message: "session cancelled".to_string(),
            };
        }

        if !session.count_tool_call() {
            return ToolOutcome::Fatal {
                kind: ToolErrorKind::UsageLimitExceeded,
                message: format!(
                    "tool invocation allowance of {} exhausted",
                    session.limits.max_tool_calls
                ),
            };
        }

        let Some(entry) = self.entries.get(name) else {
            return ToolOutcome::Retry {
                kind: ToolErrorKind::ValidationFailed,
                guidance: format!(
                    "unknown tool '{}'; available tools: {}",
                    name,
                    self.entries.keys().copied().collect::<Vec<_>>().join(", ")
                ),
                wait_hint_secs: None,
            };
        };

        if entry.failures.load(Ordering::SeqCst) >= self.breaker_threshold {
            return ToolOutcome::Retry {
                kind: ToolErrorKind::CircuitOpen,
                guidance: format!(
                    "tool '{}' is disabled for the rest of this session after repeated failures; \
                     use a different tool or finish with what you have",
                    name
                ),
                wait_hint_secs: None,
            };
        }

        match entry.tool.execute(session, args).await {
            Ok(value) => ToolOutcome::Success(value),
            Err(failure) => {
                if failure.kind.is_recoverable() {
                    entry.failures.fetch_add(1, Ordering::SeqCst);
                    tracing::warn!(
                        tool = name,
                        kind = failure.kind.as_str(),
                        "tool failed; guidance returned to the model"
                    );
                    ToolOutcome::Retry {
                        kind: failure.kind,
                        guidance: failure.message,
                        wait_hint_secs: failure.wait_hint_secs,
                    }
                } else {
                    ToolOutcome::Fatal {
                        kind: failure.kind,
                        message: failure.message,
                    }
                }
            }
        }
    }
}
