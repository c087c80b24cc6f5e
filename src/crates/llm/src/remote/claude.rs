//! Anthropic Claude client
//!
//! Claude keeps the system prompt outside the message list and carries tool
//! use as typed content blocks; both are converted here.

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::model::ChatModel;
use crate::types::{
    ChatRequest, ChatResponse, Message, MessageRole, ToolCall, UsageMetadata,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude API client
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl ClaudeClient {
    /// Create a client with the given configuration
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Split out the system prompt and convert the rest to Claude messages
    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<ClaudeMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut converted: Vec<ClaudeMessage> = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => {
                    system_prompt = Some(match system_prompt {
                        Some(existing) => format!("{}\n\n{}", existing, msg.content),
                        None => msg.content.clone(),
                    });
                }
                MessageRole::Human => converted.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: vec![ContentBlock::Text {
                        text: msg.content.clone(),
                    }],
                }),
                MessageRole::Assistant => {
                    let mut blocks = Vec::new();
                    if !msg.content.is_empty() {
                        blocks.push(ContentBlock::Text {
                            text: msg.content.clone(),
                        });
                    }
                    for tc in &msg.tool_calls {
                        blocks.push(ContentBlock::ToolUse {
                            id: tc.id.clone(),
                            name: tc.name.clone(),
                            input: tc.arguments.clone(),
                        });
                    }
                    converted.push(ClaudeMessage {
                        role: "assistant".to_string(),
                        content: blocks,
                    });
                }
                MessageRole::Tool => converted.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: msg.tool_call_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                    }],
                }),
            }
        }

        (system_prompt, converted)
    }

    fn convert_tools(&self, request: &ChatRequest) -> Option<Vec<Value>> {
        if request.tools.is_empty() {
            return None;
        }
        Some(
            request
                .tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect(),
        )
    }

    fn convert_response(&self, body: ClaudeResponse) -> ChatResponse {
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in body.content {
            match block {
                ContentBlock::Text { text: t } => text.push_str(&t),
                ContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input));
                }
                ContentBlock::ToolResult { .. } => {}
            }
        }

        ChatResponse {
            message: Message::assistant(text).with_tool_calls(tool_calls),
            usage: UsageMetadata::new(body.usage.input_tokens, body.usage.output_tokens),
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/v1/messages", self.config.base_url);

        let (system, messages) = self.convert_messages(&request.messages);
        let body = ClaudeRequest {
            model: self.config.model.clone(),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            tools: self.convert_tools(&request),
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout.as_secs())
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::Authentication(text),
                429 => LlmError::RateLimited(text),
                s if s >= 500 => LlmError::Provider(format!("{}: {}", status, text)),
                _ => LlmError::Http(format!("{}: {}", status, text)),
            });
        }

        let parsed: ClaudeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(parsed))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ClaudeClient {
        ClaudeClient::new(RemoteLlmConfig::new(
            "test-key",
            "https://api.anthropic.com",
            "claude-3-5-sonnet-20241022",
        ))
        .unwrap()
    }

    #[test]
    fn system_prompt_is_separated() {
        let messages = vec![
            Message::system("answer with tables"),
            Message::human("list suspended people"),
        ];

        let (system, converted) = client().convert_messages(&messages);
        assert_eq!(system.as_deref(), Some("answer with tables"));
        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].role, "user");
    }

    #[test]
    fn tool_results_become_user_blocks() {
        let messages = vec![Message::tool("toolu_1", "{\"rows\": []}")];
        let (_, converted) = client().convert_messages(&messages);

        assert_eq!(converted[0].role, "user");
        match &converted[0].content[0] {
            ContentBlock::ToolResult { tool_use_id, .. } => assert_eq!(tool_use_id, "toolu_1"),
            other => panic!("expected tool_result, got {:?}", other),
        }
    }

    #[test]
    fn response_extracts_text_and_tool_use() {
        let body = ClaudeResponse {
            content: vec![
                ContentBlock::Text {
                    text: "checking".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_2".to_string(),
                    name: "probe_rest".to_string(),
                    input: json!({"script": "print('{}')"}),
                },
            ],
            usage: ClaudeUsage {
                input_tokens: 300,
                output_tokens: 25,
            },
        };

        let response = client().convert_response(body);
        assert_eq!(response.message.content, "checking");
        assert_eq!(response.message.tool_calls[0].name, "probe_rest");
        assert_eq!(response.usage.input_tokens, 300);
    }
}
