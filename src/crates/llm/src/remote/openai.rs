//! OpenAI-compatible chat completions client
//!
//! Also serves local OpenAI-compatible servers (Ollama, llama.cpp,
//! LM Studio) via `base_url`.

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

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a client with the given configuration
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    MessageRole::System => "system",
                    MessageRole::Human => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::Tool => "tool",
                };
                OpenAiMessage {
                    role: role.to_string(),
                    content: if msg.content.is_empty() && msg.has_tool_calls() {
                        None
                    } else {
                        Some(msg.content.clone())
                    },
                    tool_calls: if msg.tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            msg.tool_calls
                                .iter()
                                .map(|tc| OpenAiToolCall {
                                    id: tc.id.clone(),
                                    call_type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: tc.name.clone(),
                                        arguments: tc.arguments.to_string(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: msg.tool_call_id.clone(),
                }
            })
            .collect()
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
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect(),
        )
    }

    fn convert_response(&self, body: OpenAiResponse) -> Result<ChatResponse> {
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response carried no choices".to_string()))?;

        let mut tool_calls = Vec::new();
        for tc in choice.message.tool_calls.unwrap_or_default() {
            let arguments: Value = serde_json::from_str(&tc.function.arguments)
                .map_err(|e| LlmError::InvalidResponse(format!("tool arguments: {}", e)))?;
            tool_calls.push(ToolCall::new(tc.id, tc.function.name, arguments));
        }

        let message =
            Message::assistant(choice.message.content.unwrap_or_default()).with_tool_calls(tool_calls);

        let usage = body
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ChatResponse { message, usage })
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = OpenAiRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(&request.messages),
            tools: self.convert_tools(&request),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
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

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        self.convert_response(parsed)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> OpenAiClient {
        OpenAiClient::new(RemoteLlmConfig::new(
            "test-key",
            "https://api.openai.com/v1",
            "gpt-4o",
        ))
        .unwrap()
    }

    #[test]
    fn message_conversion_maps_roles() {
        let messages = vec![
            Message::system("be helpful"),
            Message::human("who has access to app X?"),
            Message::tool("call_1", "{\"rows\": []}"),
        ];

        let converted = client().convert_messages(&messages);
        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "user");
        assert_eq!(converted[2].role, "tool");
        assert_eq!(converted[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn tool_call_arguments_are_stringified() {
        let messages = vec![Message::assistant("").with_tool_calls(vec![ToolCall::new(
            "call_9",
            "run_graph_query",
            json!({"query": "MATCH (p:Person) RETURN p.email"}),
        )])];

        let converted = client().convert_messages(&messages);
        let calls = converted[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "run_graph_query");
        assert!(calls[0].function.arguments.contains("MATCH"));
        // Content is omitted for pure tool-call turns
        assert!(converted[0].content.is_none());
    }

    #[test]
    fn response_conversion_parses_tool_calls() {
        let body = OpenAiResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".to_string(),
                    content: None,
                    tool_calls: Some(vec![OpenAiToolCall {
                        id: "call_2".to_string(),
                        call_type: "function".to_string(),
                        function: OpenAiFunctionCall {
                            name: "load_reference".to_string(),
                            arguments: "{}".to_string(),
                        },
                    }]),
                    tool_call_id: None,
                },
            }],
            usage: Some(OpenAiUsage {
                prompt_tokens: 200,
                completion_tokens: 12,
            }),
        };

        let response = client().convert_response(body).unwrap();
        assert!(response.message.has_tool_calls());
        assert_eq!(response.message.tool_calls[0].name, "load_reference");
        assert_eq!(response.usage.total(), 212);
    }
}
