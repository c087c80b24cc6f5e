//! Structured progress events
//!
//! Every event is a JSON object with a `type` discriminator. The agent
//! emits them into the session's channel; the SSE fabric serializes them
//! to the client, applying the batching rule to COMPLETE payloads.

use crate::answer::FinalPayload;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured progress event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// The agent entered a new reasoning/tool phase
    #[serde(rename = "STEP-START")]
    StepStart {
        step: usize,
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
        timestamp: String,
    },

    /// The phase completed, successfully or not
    #[serde(rename = "STEP-END")]
    StepEnd {
        step: usize,
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },

    /// The agent invoked a tool
    #[serde(rename = "TOOL-CALL")]
    ToolCall { tool: String, description: String },

    /// A long-running operation reported progress
    #[serde(rename = "STEP-PROGRESS")]
    StepProgress {
        label: String,
        current: u64,
        total: u64,
        status: String,
    },

    /// Per-step LLM token accounting
    #[serde(rename = "STEP-TOKENS")]
    StepTokens {
        input: u64,
        output: u64,
        total: u64,
        requests: u64,
    },

    /// A tool is backing off
    #[serde(rename = "RATE-LIMIT")]
    RateLimit { wait_seconds: u64, message: String },

    /// Precedes a batched result set
    #[serde(rename = "METADATA")]
    Metadata {
        total_batches: usize,
        total_records: usize,
        display: String,
        metadata: Value,
    },

    /// One chunk of a large result
    #[serde(rename = "BATCH")]
    Batch { batch: usize, rows: Vec<Value> },

    /// Terminal success; `payload` is absent when the result was batched
    #[serde(rename = "COMPLETE")]
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<FinalPayload>,
    },

    /// Terminal failure
    #[serde(rename = "ERROR")]
    Error { error: String, kind: String },
}

impl AgentEvent {
    /// A STEP-START stamped now
    pub fn step_start(step: usize, title: impl Into<String>, reasoning: Option<String>) -> Self {
        AgentEvent::StepStart {
            step,
            title: title.into(),
            reasoning,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Whether this event terminates the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Complete { .. } | AgentEvent::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_discriminator() {
        let event = AgentEvent::ToolCall {
            tool: "run_graph_query".to_string(),
            description: "querying the snapshot".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TOOL-CALL");
        assert_eq!(json["tool"], "run_graph_query");
    }

    #[test]
    fn terminal_classification() {
        assert!(AgentEvent::Complete { payload: None }.is_terminal());
        assert!(AgentEvent::Error {
            error: "x".to_string(),
            kind: "unrecoverable".to_string()
        }
        .is_terminal());
        assert!(!AgentEvent::step_start(1, "thinking", None).is_terminal());
    }

    #[test]
    fn step_events_round_trip() {
        let event = AgentEvent::StepTokens {
            input: 1200,
            output: 80,
            total: 1280,
            requests: 1,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: AgentEvent = serde_json::from_str(&json).unwrap();
        match back {
            AgentEvent::StepTokens { total, .. } => assert_eq!(total, 1280),
            other => panic!("unexpected {:?}", other),
        }
    }
}
