//! The fixed tool surface
//!
//! Six tools, registered per session: reference lookup, operation
//! documentation, graph queries, REST probes, code-library writes, and
//! event-type enumeration.

pub mod reference;

use crate::error::ToolErrorKind;
use crate::registry::{SessionTool, ToolFailure, ToolRegistry};
use crate::session::SessionContext;
use async_trait::async_trait;
use graphstore::{GraphError, SnapshotStore};
use sandbox::{ProbeExecutor, SandboxError};
use serde_json::{json, Value};
use std::sync::Arc;

/// Ceiling on operations per describe_operations call
const MAX_DESCRIBE: usize = 5;

/// Rows returned into the model's context per graph query; the full count
/// is always reported alongside.
const MAX_ROWS_IN_CONTEXT: usize = 100;

/// Build the per-session registry with the full tool surface
pub fn build_registry(
    store: Arc<SnapshotStore>,
    executor: Arc<ProbeExecutor>,
    breaker_threshold: usize,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new(breaker_threshold);
    registry.register(Arc::new(LoadReference {
        store: store.clone(),
    }));
    registry.register(Arc::new(DescribeOperations));
    registry.register(Arc::new(RunGraphQuery { store }));
    registry.register(Arc::new(ProbeRest { executor }));
    registry.register(Arc::new(StoreReadResult));
    registry.register(Arc::new(GetDetailedEventTypes));
    registry
}

/// `load_reference`: compact index of labels, relationships, operations
struct LoadReference {
    store: Arc<SnapshotStore>,
}

#[async_trait]
impl SessionTool for LoadReference {
    fn name(&self) -> &'static str {
        "load_reference"
    }

    fn description(&self) -> &'static str {
        "Load the compact index of graph labels, relationships, and REST operation names"
    }

    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}, "additionalProperties": false})
    }

    async fn execute(&self, _session: &SessionContext, _args: Value) -> Result<Value, ToolFailure> {
        let mut person_columns: Vec<String> = graphstore::schema::PERSON_CORE_COLUMNS
            .iter()
            .chain(graphstore::schema::PERSON_PROFILE_COLUMNS.iter())
            .map(|c| c.to_string())
            .collect();

        let snapshot_available = match self.store.current() {
            Ok(snapshot) => {
                person_columns
                    .extend(snapshot.schema().person_dynamic_columns().map(String::from));
                true
            }
            Err(_) => false,
        };

        Ok(reference::reference_index(person_columns, snapshot_available))
    }
}

/// `describe_operations`: full documentation blobs for up to five ops
struct DescribeOperations;

#[async_trait]
impl SessionTool for DescribeOperations {
    fn name(&self) -> &'static str {
        "describe_operations"
    }

    fn description(&self) -> &'static str {
        "Fetch full documentation (parameters, examples, caveats) for up to 5 REST operations"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["operations"],
            "properties": {
                "operations": {
                    "type": "array",
                    "items": {"type": "string"},
                    "maxItems": MAX_DESCRIBE
                }
            }
        })
    }

    async fn execute(&self, _session: &SessionContext, args: Value) -> Result<Value, ToolFailure> {
        let names: Vec<String> = serde_json::from_value(args["operations"].clone())
            .map_err(|e| ToolFailure::new(ToolErrorKind::ValidationFailed, e.to_string()))?;

        if names.len() > MAX_DESCRIBE {
            return Err(ToolFailure::new(
                ToolErrorKind::ValidationFailed,
                format!("describe_operations takes at most {} names", MAX_DESCRIBE),
            ));
        }

        let mut docs = Vec::new();
        for name in &names {
            match reference::describe_operation(name) {
                Some(doc) => docs.push(doc),
                None => {
                    return Err(ToolFailure::new(
                        ToolErrorKind::InvalidEndpoint,
                        format!(
                            "unknown operation '{}'; valid operations: {}",
                            name,
                            reference::OPERATIONS.join(", ")
                        ),
                    ))
                }
            }
        }
        Ok(json!({"operations": docs}))
    }
}

/// `run_graph_query`: execute a read-only query against the snapshot
struct RunGraphQuery {
    store: Arc<SnapshotStore>,
}

#[async_trait]
impl SessionTool for RunGraphQuery {
    fn name(&self) -> &'static str {
        "run_graph_query"
    }

    fn description(&self) -> &'static str {
        "Run a read-only graph query against the current tenant snapshot"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {"query": {"type": "string"}}
        })
    }

    async fn execute(&self, session: &SessionContext, args: Value) -> Result<Value, ToolFailure> {
        let query = args["query"]
            .as_str()
            .ok_or_else(|| {
                ToolFailure::new(ToolErrorKind::ValidationFailed, "missing 'query' argument")
            })?
            .to_string();

        let snapshot = self.store.current().map_err(|_| {
            ToolFailure::new(
                ToolErrorKind::ValidationFailed,
                "no snapshot has been promoted yet; use probe_rest for live data",
            )
        })?;

        let budget = session.limits.budgets.graph_query_secs;
        let version = snapshot.version();
        let handle =
            tokio::task::spawn_blocking(move || graphstore::run_query(&snapshot, &query));
        let result = tooling::async_utils::timeout::with_budget(budget, handle)
            .await
            .map_err(|_| {
                ToolFailure::new(
                    ToolErrorKind::Timeout,
                    format!("graph query exceeded its {}s budget", budget),
                )
            })?
            .map_err(|e| ToolFailure::new(ToolErrorKind::Unrecoverable, e.to_string()))?;

        match result {
            Ok(table) => {
                let total = table.row_count();
                let mut rows = table.to_row_objects();
                rows.truncate(MAX_ROWS_IN_CONTEXT);
                Ok(json!({
                    "columns": table.columns,
                    "rows": rows,
                    "row_count": total,
                    "truncated": (total > MAX_ROWS_IN_CONTEXT),
                    "snapshot_version": version,
                }))
            }
            Err(error) => Err(map_graph_error(error)),
        }
    }
}

fn map_graph_error(error: GraphError) -> ToolFailure {
    match &error {
        GraphError::UnsafeQuery(_) => ToolFailure::new(
            ToolErrorKind::UnsafeQuery,
            format!("{}; rewrite the query without mutating keywords", error),
        ),
        GraphError::InvalidAttribute { .. } => {
            ToolFailure::new(ToolErrorKind::InvalidAttribute, error.to_string())
        }
        GraphError::UnknownLabel(_) | GraphError::UnknownRelationship(_) => {
            ToolFailure::new(ToolErrorKind::InvalidAttribute, error.to_string())
        }
        GraphError::Parse(_) => ToolFailure::new(
            ToolErrorKind::ValidationFailed,
            format!("{}; check the query syntax", error),
        ),
        _ => ToolFailure::new(ToolErrorKind::Unrecoverable, error.to_string()),
    }
}

/// `probe_rest`: run a validated probe program in a child process
struct ProbeRest {
    executor: Arc<ProbeExecutor>,
}

#[async_trait]
impl SessionTool for ProbeRest {
    fn name(&self) -> &'static str {
        "probe_rest"
    }

    fn description(&self) -> &'static str {
        "Execute a short read-only program that issues GETs against the management API \
         through the shared client wrapper and prints one JSON document"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["script"],
            "properties": {"script": {"type": "string"}}
        })
    }

    async fn execute(&self, session: &SessionContext, args: Value) -> Result<Value, ToolFailure> {
        let script = args["script"]
            .as_str()
            .ok_or_else(|| {
                ToolFailure::new(ToolErrorKind::ValidationFailed, "missing 'script' argument")
            })?
            .to_string();

        // One probe at a time within a session
        let _slot = self.probe_slot_guard(session)?;

        match self.executor.execute(&script, session.cancel_receiver()).await {
            Ok(output) => {
                emit_probe_progress(session, &output.stderr).await;
                Ok(json!({"output": output.json}))
            }
            Err(error) => Err(map_sandbox_error(error)),
        }
    }
}

/// Probe programs may report progress by writing lines of the form
/// `progress:<label>:<current>/<total>` to stderr; each becomes a
/// STEP-PROGRESS event. Everything else on stderr is logged.
async fn emit_probe_progress(session: &SessionContext, stderr: &str) {
    for line in stderr.lines() {
        let Some(rest) = line.trim().strip_prefix("progress:") else {
            if !line.trim().is_empty() {
                tracing::debug!(line, "probe stderr");
            }
            continue;
        };
        let Some((label, counts)) = rest.split_once(':') else {
            continue;
        };
        let Some((current, total)) = counts.split_once('/') else {
            continue;
        };
        if let (Ok(current), Ok(total)) = (current.trim().parse(), total.trim().parse()) {
            session
                .emit(crate::events::AgentEvent::StepProgress {
                    label: label.to_string(),
                    current,
                    total,
                    status: "running".to_string(),
                })
                .await;
        }
    }
}

impl ProbeRest {
    fn probe_slot_guard<'a>(
        &self,
        session: &'a SessionContext,
    ) -> Result<tokio::sync::MutexGuard<'a, ()>, ToolFailure> {
        session.probe_slot.try_lock().map_err(|_| {
            ToolFailure::new(
                ToolErrorKind::ValidationFailed,
                "a probe is already running in this session; wait for it to finish",
            )
        })
    }
}

fn map_sandbox_error(error: SandboxError) -> ToolFailure {
    match error {
        SandboxError::UnsafeProgram(reason) => ToolFailure::new(
            ToolErrorKind::UnsafeProgram,
            format!("{}; rewrite the program within the sandbox rules", reason),
        ),
        SandboxError::Timeout {
            timeout_secs,
            partial_stdout,
            partial_stderr,
        } => ToolFailure::new(
            ToolErrorKind::Timeout,
            format!(
                "probe killed after {}s; partial stdout: {:.400}; partial stderr: {:.400}",
                timeout_secs, partial_stdout, partial_stderr
            ),
        ),
        SandboxError::Cancelled => {
            ToolFailure::new(ToolErrorKind::Cancelled, "session cancelled")
        }
        SandboxError::Busy => ToolFailure {
            kind: ToolErrorKind::TransientUpstream,
            message: "probe capacity saturated; retry shortly".to_string(),
            wait_hint_secs: Some(5),
        },
        SandboxError::Failed { status, stderr } => ToolFailure::new(
            ToolErrorKind::ValidationFailed,
            format!("probe exited with status {}: {:.400}", status, stderr),
        ),
        SandboxError::OutputParse(detail) => ToolFailure::new(
            ToolErrorKind::ValidationFailed,
            format!(
                "probe must print exactly one JSON document on stdout: {}",
                detail
            ),
        ),
        SandboxError::Spawn(detail) => {
            ToolFailure::new(ToolErrorKind::Unrecoverable, detail)
        }
        SandboxError::Io(e) => ToolFailure::new(ToolErrorKind::Unrecoverable, e.to_string()),
    }
}

/// `store_read_result`: append a validated read to the Code Library
struct StoreReadResult;

#[async_trait]
impl SessionTool for StoreReadResult {
    fn name(&self) -> &'static str {
        "store_read_result"
    }

    fn description(&self) -> &'static str {
        "Store a completed read operation (source text, entity ids, rows) in the session's code library"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["step_id", "source", "entity_ids", "rows"],
            "properties": {
                "step_id": {"type": "string"},
                "source": {"type": "string"},
                "entity_ids": {"type": "array", "items": {"type": "string"}},
                "rows": {"type": "array"}
            }
        })
    }

    async fn execute(&self, session: &SessionContext, args: Value) -> Result<Value, ToolFailure> {
        let step_id = args["step_id"].as_str().ok_or_else(|| {
            ToolFailure::new(ToolErrorKind::ValidationFailed, "missing 'step_id'")
        })?;
        let source = args["source"].as_str().ok_or_else(|| {
            ToolFailure::new(ToolErrorKind::ValidationFailed, "missing 'source'")
        })?;
        let entity_ids: Vec<String> = serde_json::from_value(args["entity_ids"].clone())
            .map_err(|e| ToolFailure::new(ToolErrorKind::ValidationFailed, e.to_string()))?;
        let rows: Vec<Value> = args["rows"].as_array().cloned().unwrap_or_default();
        let entity_count = entity_ids.len();

        let mut library = session.library.lock().await;
        library
            .append_read(step_id, source, entity_ids, rows)
            .map_err(|e| ToolFailure::new(ToolErrorKind::ValidationFailed, e.to_string()))?;

        Ok(json!({"stored": true, "step_id": step_id, "entity_count": entity_count}))
    }
}

/// `get_detailed_event_types`: enumerate event-type ids per category
struct GetDetailedEventTypes;

#[async_trait]
impl SessionTool for GetDetailedEventTypes {
    fn name(&self) -> &'static str {
        "get_detailed_event_types"
    }

    fn description(&self) -> &'static str {
        "Enumerate system-log event type identifiers for the given categories"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "required": ["categories"],
            "properties": {
                "categories": {"type": "array", "items": {"type": "string"}}
            }
        })
    }

    async fn execute(&self, _session: &SessionContext, args: Value) -> Result<Value, ToolFailure> {
        let categories: Vec<String> = serde_json::from_value(args["categories"].clone())
            .map_err(|e| ToolFailure::new(ToolErrorKind::ValidationFailed, e.to_string()))?;

        let mut result = serde_json::Map::new();
        for category in &categories {
            match reference::event_types_for(category) {
                Some(types) => {
                    result.insert(category.clone(), json!(types));
                }
                None => {
                    return Err(ToolFailure::new(
                        ToolErrorKind::InvalidEndpoint,
                        format!(
                            "unknown category '{}'; valid categories: {}",
                            category,
                            reference::EVENT_CATEGORIES.join(", ")
                        ),
                    ))
                }
            }
        }
        Ok(Value::Object(result))
    }
}
