//! Core trait for chat-based language models

use crate::error::Result;
use crate::types::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// Provider-agnostic chat interface
///
/// The agent runtime drives this trait; implementations convert messages and
/// tool definitions to their provider's wire format. Implementations must be
/// `Send + Sync` and are shared as `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response.
    ///
    /// Implementations surface 401 as `LlmError::Authentication`, 429 as
    /// `LlmError::RateLimited`, and 5xx as `LlmError::Provider` so the
    /// runtime can map them onto its retry taxonomy.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Model identifier used in logs and token accounting
    fn model_name(&self) -> &str;
}
