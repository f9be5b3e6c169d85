//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::{AskError, Result};
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates an LLM client for the configured provider.
///
/// For OpenAI the API key is resolved in order:
/// 1. `api_key` in the config (already merged from `OPENAI_API_KEY` by `Config::apply_env`)
/// 2. The `OPENAI_API_KEY` environment variable
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    create_client_with_key(config, std::env::var("OPENAI_API_KEY").ok())
}

fn create_client_with_key(
    config: &LlmConfig,
    env_key: Option<String>,
) -> Result<Arc<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse().map_err(AskError::config)?;

    match provider {
        LlmProvider::OpenAi => {
            let key = config
                .api_key
                .clone()
                .or(env_key)
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AskError::config("No API key configured. Set OPENAI_API_KEY."))?;

            let openai = OpenAiConfig::new(key, config.model.clone())
                .with_base_url(config.base_url.clone())
                .with_timeout(config.timeout_secs)
                .with_max_retries(config.max_retries);
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}
