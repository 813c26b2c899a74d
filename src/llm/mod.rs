//! LLM module - Language Model integrations
//!
//! Provides abstractions for different LLM backends with Ollama as the default
//! and any OpenAI-compatible endpoint as the alternative.

pub mod ollama;
pub mod openai;
pub mod provider;
pub mod traits;

#[cfg(test)]
pub(crate) mod scripted;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use provider::create_provider;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
