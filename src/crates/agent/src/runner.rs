//! The ReAct loop
//!
//! Alternates model reasoning and tool execution until the model produces
//! a terminal payload or a safety limit fires. Tool invocations within a
//! session are strictly serial; the runner owns the conversation and the
//! session's event emission.

use crate::answer::parse_final_answer;
use crate::error::ToolErrorKind;
use crate::events::AgentEvent;
use crate::prompts;
use crate::registry::{ToolOutcome, ToolRegistry};
use crate::session::SessionContext;
use llm::{ChatModel, ChatRequest, Message};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tooling::async_utils::timeout::with_budget;

/// Runner configuration
#[derive(Clone)]
pub struct RunnerConfig {
    /// Retries for transient model failures within one step
    pub llm_retries: usize,

    /// Attempts the model gets to produce a schema-valid terminal payload
    pub schema_retries: usize,

    /// Last successful snapshot promotion time, for result metadata
    pub last_sync_time: Option<String>,

    /// Whether a snapshot is available (steers the system prompt)
    pub snapshot_available: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            llm_retries: 2,
            schema_retries: 3,
            last_sync_time: None,
            snapshot_available: true,
        }
    }
}

/// Drives one session's agent loop
pub struct AgentRunner {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl AgentRunner {
    /// Create a runner over a model and a per-session registry
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self {
            model,
            registry,
            config,
        }
    }

    /// Run the loop to completion, emitting events into the session.
    ///
    /// Every exit path emits a terminal COMPLETE or ERROR event, except
    /// cancellation, which ends the stream without COMPLETE.
    pub async fn run(&self, session: Arc<SessionContext>) {
        let started = Instant::now();
        let wall_budget = session.limits.budgets.session_secs;

        let mut messages = vec![
            Message::system(prompts::system_prompt(
                &session.tenant_id,
                self.config.snapshot_available,
            )),
            Message::human(session.query.clone()),
        ];

        let mut step = 0usize;
        let mut schema_failures = 0usize;
        let mut total_input_tokens = 0u64;
        let mut total_output_tokens = 0u64;
        let mut requests = 0u64;

        loop {
            if session.is_cancelled() {
                tracing::info!(process_id = %session.process_id, "session cancelled; stream closes");
                return;
            }
            if started.elapsed().as_secs() > wall_budget {
                session
                    .emit(AgentEvent::Error {
                        error: format!("session exceeded its {}s wall-clock budget", wall_budget),
                        kind: ToolErrorKind::Timeout.as_str().to_string(),
                    })
                    .await;
                return;
            }

            step += 1;
            session
                .emit(AgentEvent::step_start(step, "Reasoning", None))
                .await;

            let response = match self.chat_with_retries(&session, &messages).await {
                Ok(response) => response,
                Err(error) => {
                    session
                        .emit(AgentEvent::Error {
                            error,
                            kind: ToolErrorKind::Unrecoverable.as_str().to_string(),
                        })
                        .await;
                    return;
                }
            };

            requests += 1;
            total_input_tokens += response.usage.input_tokens;
            total_output_tokens += response.usage.output_tokens;
            session
                .emit(AgentEvent::StepTokens {
                    input: total_input_tokens,
                    output: total_output_tokens,
                    total: total_input_tokens + total_output_tokens,
                    requests,
                })
                .await;

            let assistant = response.message;

            if assistant.has_tool_calls() {
                messages.push(assistant.clone());

                for call in &assistant.tool_calls {
                    session
                        .emit(AgentEvent::ToolCall {
                            tool: call.name.clone(),
                            description: summarize_args(&call.arguments),
                        })
                        .await;

                    let outcome = self
                        .registry
                        .dispatch(&session, &call.name, call.arguments.clone())
                        .await;

                    match outcome {
                        ToolOutcome::Success(value) => {
                            messages.push(Message::tool(call.id.clone(), value.to_string()));
                        }
                        ToolOutcome::Retry {
                            kind,
                            guidance,
                            wait_hint_secs,
                        } => {
                            if let Some(wait) = wait_hint_secs {
                                session
                                    .emit(AgentEvent::RateLimit {
                                        wait_seconds: wait,
                                        message: guidance.clone(),
                                    })
                                    .await;
                            }
                            let body = json!({
                                "error": kind.as_str(),
                                "guidance": guidance,
                                "retry": true,
                            });
                            messages.push(Message::tool(call.id.clone(), body.to_string()));
                        }
                        ToolOutcome::Fatal { kind, message } => {
                            if kind == ToolErrorKind::Cancelled {
                                tracing::info!(
                                    process_id = %session.process_id,
                                    "session cancelled during tool dispatch"
                                );
                                return;
                            }
                            session
                                .emit(AgentEvent::Error {
                                    error: message,
                                    kind: kind.as_str().to_string(),
                                })
                                .await;
                            return;
                        }
                    }
                }

                session
                    .emit(AgentEvent::StepEnd {
                        step,
                        text: format!("{} tool call(s) dispatched", assistant.tool_calls.len()),
                        summary: None,
                    })
                    .await;
                continue;
            }

            // No tool calls: this is the terminal turn
            match parse_final_answer(&assistant.content, self.config.last_sync_time.clone()) {
                Ok(payload) => {
                    session
                        .emit(AgentEvent::StepEnd {
                            step,
                            text: "final answer assembled".to_string(),
                            summary: Some(format!("{} rows", payload.metadata.total_rows)),
                        })
                        .await;
                    session
                        .emit(AgentEvent::Complete {
                            payload: Some(payload),
                        })
                        .await;
                    return;
                }
                Err(violations) => {
                    schema_failures += 1;
                    session
                        .emit(AgentEvent::StepEnd {
                            step,
                            text: "terminal payload failed validation".to_string(),
                            summary: None,
                        })
                        .await;

                    if schema_failures >= self.config.schema_retries {
                        session
                            .emit(AgentEvent::Error {
                                error: format!(
                                    "structured output failed validation after {} attempts: {}",
                                    schema_failures,
                                    violations.join("; ")
                                ),
                                kind: ToolErrorKind::ValidationFailed.as_str().to_string(),
                            })
                            .await;
                        return;
                    }

                    messages.push(assistant);
                    messages.push(Message::human(format!(
                        "validation_failed: your final answer did not match the required schema: {}. \
                         Reply again with ONLY the corrected JSON object.",
                        violations.join("; ")
                    )));
                }
            }
        }
    }

    async fn chat_with_retries(
        &self,
        session: &SessionContext,
        messages: &[Message],
    ) -> Result<llm::ChatResponse, String> {
        let budget = session.limits.budgets.llm_secs;
        let mut last_error = String::new();

        for attempt in 0..=self.config.llm_retries {
            if session.is_cancelled() {
                return Err("session cancelled".to_string());
            }

            let request = ChatRequest::new(messages.to_vec())
                .with_tools(self.registry.definitions())
                .with_temperature(0.0);

            match with_budget(budget, self.model.chat(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(error)) if error.is_transient() && attempt < self.config.llm_retries => {
                    tracing::warn!(attempt, %error, "transient llm failure; retrying");
                    last_error = error.to_string();
                    tokio::time::sleep(std::time::Duration::from_millis(250 * (attempt as u64 + 1)))
                        .await;
                }
                Ok(Err(error)) => return Err(error.to_string()),
                Err(_) if attempt < self.config.llm_retries => {
                    last_error = format!("llm call exceeded its {}s budget", budget);
                    tracing::warn!(attempt, "llm call timed out; retrying");
                }
                Err(_) => return Err(format!("llm call exceeded its {}s budget", budget)),
            }
        }
        Err(last_error)
    }
}

fn summarize_args(args: &serde_json::Value) -> String {
    let text = args.to_string();
    if text.chars().count() > 160 {
        let truncated: String = text.chars().take(160).collect();
        format!("{}...", truncated)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionLimits;
    use crate::tools::build_registry;
    use async_trait::async_trait;
    use graphstore::{Node, PromotionReport, SnapshotStore};
    use llm::{ChatResponse, LlmError, ToolCall, UsageMetadata};
    use sandbox::{ExecutorConfig, ProbeExecutor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Scripted model: plays back a fixed sequence of turns
    struct ScriptedModel {
        turns: Vec<Message>,
        cursor: AtomicUsize,
    }

    impl ScriptedModel {
        fn new(turns: Vec<Message>) -> Self {
            Self {
                turns,
                cursor: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn chat(&self, _request: ChatRequest) -> llm::Result<ChatResponse> {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            let message = self
                .turns
                .get(index)
                .cloned()
                .unwrap_or_else(|| self.turns.last().cloned().expect("script not empty"));
            Ok(ChatResponse {
                message,
                usage: UsageMetadata::new(100, 20),
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn chat(&self, _request: ChatRequest) -> llm::Result<ChatResponse> {
            Err(LlmError::Authentication("bad key".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn seeded_store() -> Arc<SnapshotStore> {
        let dir = tempfile::tempdir().unwrap().into_path();
        let store = SnapshotStore::open(&dir).unwrap();
        let mut writer = store.begin_staging().unwrap();
        writer
            .upsert_node(
                "Person",
                Node::new("p1")
                    .with_text("email", "kim@acme.com")
                    .with_text("status", "active"),
            )
            .unwrap();
        writer.upsert_node("Team", Node::new("t1")).unwrap();
        writer.upsert_node("Application", Node::new("a1")).unwrap();
        writer.upsert_node("Factor", Node::new("f1")).unwrap();
        let counts = writer.counts();
        let version = writer.finish().unwrap();
        store
            .promote(
                version,
                &PromotionReport {
                    success: true,
                    counts,
                    ended_at: Some("2026-01-01T03:00:00Z".to_string()),
                },
            )
            .unwrap();
        Arc::new(store)
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut config = ExecutorConfig::new("https://acme.okta.com", "tok");
        config.interpreter = vec!["sh".to_string()];
        config.scratch_dir = tempfile::tempdir().unwrap().into_path();
        Arc::new(build_registry(
            seeded_store(),
            Arc::new(ProbeExecutor::new(config)),
            3,
        ))
    }

    fn final_answer() -> String {
        json!({
            "display": "table",
            "columns": [{"key": "email", "label": "Email"}],
            "rows": [{"email": "kim@acme.com"}],
            "data_source": "snapshot"
        })
        .to_string()
    }

    async fn drain(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn tool_call_then_answer_completes_with_ordered_events() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "call_1",
                "run_graph_query",
                json!({"query": "MATCH (p:Person) RETURN p.email"}),
            )]),
            Message::assistant(final_answer()),
        ]));
        let runner = AgentRunner::new(model, registry(), RunnerConfig::default());
        let (session, rx) = SessionContext::new("p", "who?", "acme", SessionLimits::default());
        let session = Arc::new(session);

        runner.run(session).await;
        let events = drain(rx).await;

        // COMPLETE is last and preceded by at least one STEP-START/STEP-END pair
        assert!(matches!(events.last().unwrap(), AgentEvent::Complete { .. }));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::StepStart { .. })));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::StepEnd { .. })));
        assert!(events.iter().any(|e| matches!(e, AgentEvent::ToolCall { tool, .. } if tool == "run_graph_query")));

        match events.last().unwrap() {
            AgentEvent::Complete { payload: Some(payload) } => {
                assert_eq!(payload.metadata.total_rows, 1);
                assert_eq!(payload.metadata.data_source, "snapshot");
            }
            other => panic!("unexpected terminal {:?}", other),
        }
    }

    #[tokio::test]
    async fn usage_limit_breach_emits_exactly_one_error() {
        // Model calls tools forever
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("")
            .with_tool_calls(vec![ToolCall::new(
                "load_reference",
                "load_reference",
                json!({}),
            )])]));
        let limits = SessionLimits {
            max_tool_calls: 3,
            ..Default::default()
        };
        let runner = AgentRunner::new(model, registry(), RunnerConfig::default());
        let (session, rx) = SessionContext::new("p", "loop", "acme", limits);

        runner.run(Arc::new(session)).await;
        let events = drain(rx).await;

        let errors: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Error { kind, .. } => Some(kind.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["usage_limit_exceeded".to_string()]);
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn unsafe_query_becomes_guidance_then_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "call_1",
                "run_graph_query",
                json!({"query": "MATCH (p:Person) DELETE p"}),
            )]),
            Message::assistant(final_answer()),
        ]));
        let runner = AgentRunner::new(model, registry(), RunnerConfig::default());
        let (session, rx) = SessionContext::new("p", "q", "acme", SessionLimits::default());

        runner.run(Arc::new(session)).await;
        let events = drain(rx).await;

        // The unsafe query did not kill the session; it completed
        assert!(matches!(events.last().unwrap(), AgentEvent::Complete { .. }));
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_emits_no_complete() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant("")
            .with_tool_calls(vec![ToolCall::new(
                "call_1",
                "probe_rest",
                json!({"script": "sleep 30\necho '{}'"}),
            )])]));
        let runner = AgentRunner::new(model, registry(), RunnerConfig::default());
        let (session, rx) = SessionContext::new("p", "q", "acme", SessionLimits::default());
        let session = Arc::new(session);

        let cancel_handle = session.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel_handle.cancel();
        });

        runner.run(session).await;
        let events = drain(rx).await;
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn invalid_final_payload_gets_retried_then_fails() {
        let model = Arc::new(ScriptedModel::new(vec![Message::assistant(
            "this is prose, not JSON",
        )]));
        let config = RunnerConfig {
            schema_retries: 2,
            ..Default::default()
        };
        let runner = AgentRunner::new(model, registry(), config);
        let (session, rx) = SessionContext::new("p", "q", "acme", SessionLimits::default());

        runner.run(Arc::new(session)).await;
        let events = drain(rx).await;

        match events.last().unwrap() {
            AgentEvent::Error { kind, .. } => assert_eq!(kind, "validation_failed"),
            other => panic!("unexpected terminal {:?}", other),
        }
    }

    #[tokio::test]
    async fn permanent_llm_failure_is_terminal() {
        let runner = AgentRunner::new(Arc::new(FailingModel), registry(), RunnerConfig::default());
        let (session, rx) = SessionContext::new("p", "q", "acme", SessionLimits::default());

        runner.run(Arc::new(session)).await;
        let events = drain(rx).await;

        match events.last().unwrap() {
            AgentEvent::Error { kind, .. } => assert_eq!(kind, "unrecoverable"),
            other => panic!("unexpected terminal {:?}", other),
        }
    }
}
