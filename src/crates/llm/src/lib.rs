//! LLM provider implementations for the idlens agent runtime
//!
//! Provides the `ChatModel` trait the agent loop drives, plus remote
//! implementations for OpenAI-compatible endpoints and Anthropic Claude.
//! Local servers (Ollama, llama.cpp) are reachable through the
//! OpenAI-compatible client via `base_url`.

pub mod config;
pub mod error;
pub mod model;
pub mod remote;
pub mod schema;
pub mod types;

pub use config::{provider_from_env, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use model::ChatModel;
pub use schema::SchemaValidator;
pub use types::{
    ChatRequest, ChatResponse, Message, MessageRole, ToolCall, ToolDefinition, UsageMetadata,
};
