//! Provider configuration and selection

use crate::error::{LlmError, Result};
use crate::model::ChatModel;
use crate::remote::{ClaudeClient, OpenAiClient};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a remote provider
#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    /// API key
    pub api_key: String,

    /// Endpoint base URL
    pub base_url: String,

    /// Model identifier
    pub model: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl RemoteLlmConfig {
    /// Create a configuration
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Load from an environment variable holding the key
    pub fn from_env(key_var: &str, base_url: &str, model: &str) -> Result<Self> {
        let api_key =
            tooling::config::require(key_var).map_err(|e| LlmError::Config(e.to_string()))?;
        Ok(Self::new(api_key, base_url, model))
    }
}

/// Build the provider selected by `LLM_PROVIDER` (`openai` | `claude`).
///
/// `LLM_MODEL` overrides the default model; `LLM_BASE_URL` points the
/// OpenAI-compatible client at a different endpoint (e.g. a local server).
pub fn provider_from_env() -> Result<Arc<dyn ChatModel>> {
    let provider = tooling::config::or_default("LLM_PROVIDER", "openai");

    match provider.as_str() {
        "openai" => {
            let base_url =
                tooling::config::or_default("LLM_BASE_URL", "https://api.openai.com/v1");
            let model = tooling::config::or_default("LLM_MODEL", "gpt-4o");
            let config = RemoteLlmConfig::from_env("OPENAI_API_KEY", &base_url, &model)?;
            Ok(Arc::new(OpenAiClient::new(config)?))
        }
        "claude" => {
            let model =
                tooling::config::or_default("LLM_MODEL", "claude-3-5-sonnet-20241022");
            let config =
                RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", "https://api.anthropic.com", &model)?;
            Ok(Arc::new(ClaudeClient::new(config)?))
        }
        other => Err(LlmError::Config(format!("unknown LLM provider: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = RemoteLlmConfig::new("key", "https://api.openai.com/v1/", "gpt-4o");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
