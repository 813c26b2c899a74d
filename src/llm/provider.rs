//! LLM provider factory

use std::sync::Arc;

use crate::core::{Config, ProviderType, Result};
use crate::llm::openai::OpenAiClient;
use crate::llm::traits::LLMProvider;
use crate::llm::OllamaClient;

/// Create a new LLM provider based on configuration
pub fn create_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let provider: Arc<dyn LLMProvider> = match config.llm.provider {
        ProviderType::Ollama => Arc::new(OllamaClient::from_config(config)?),
        ProviderType::OpenAi => Arc::new(OpenAiClient::from_config(config)?),
    };
    Ok(provider)
}
