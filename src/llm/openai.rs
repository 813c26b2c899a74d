//! OpenAI-compatible chat completions client
//!
//! Talks to `<base_url>/chat/completions` with bearer auth. Works with OpenAI
//! itself and the many servers that mirror its API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, GuideError, Message, Result, ToolCall, ToolDefinition};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    /// Create a client from configuration. Fails without an API key.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .llm
            .openai_api_key
            .clone()
            .ok_or_else(|| GuideError::config("OPENAI_API_KEY is not set"))?;

        Self::new(
            config.llm.openai_base_url.clone(),
            api_key,
            config.llm.timeout_secs,
        )
    }

    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn build_body(
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<serde_json::Value> {
        let wire_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| serde_json::json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = serde_json::json!({
            "model": model,
            "messages": wire_messages,
            "stream": false,
        });

        if let Some(opts) = options {
            if let Some(t) = opts.temperature {
                body["temperature"] = serde_json::json!(t);
            }
            if let Some(max) = opts.max_tokens {
                body["max_tokens"] = serde_json::json!(max);
            }
            if opts.json_mode {
                body["response_format"] = serde_json::json!({"type": "json_object"});
            }
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::to_value(tools)?;
            body["tool_choice"] = serde_json::json!("auto");
        }

        Ok(body)
    }

    fn to_llm_response(response: CompletionResponse) -> Result<LLMResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GuideError::llm("Response contained no choices"))?;

        let mut tool_calls = Vec::with_capacity(choice.message.tool_calls.len());
        for call in choice.message.tool_calls {
            let arguments = if call.function.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&call.function.arguments)?
            };
            tool_calls.push(ToolCall::new(call.function.name, arguments));
        }

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: response
                .usage
                .and_then(|u| TokenUsage::from_counts(Some(u.prompt_tokens), Some(u.completion_tokens))),
            model: response.model,
        })
    }

    async fn complete(&self, body: serde_json::Value) -> Result<LLMResponse> {
        debug!(model = %body["model"], "sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GuideError::llm(format!(
                "Chat completion error ({}): {}",
                status, error_text
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GuideError::llm(format!("Failed to parse response: {}", e)))?;

        Self::to_llm_response(parsed)
    }
}

#[async_trait]
impl LLMProvider for OpenAiClient {
    async fn chat(
        &self,
        model: &str,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let body = Self::build_body(model, messages, &[], options)?;
        self.complete(body).await
    }

    async fn chat_with_tools(
        &self,
        model: &str,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let body = Self::build_body(model, messages, tools, options)?;
        self.complete(body).await
    }

    async fn is_model_available(&self, model: &str) -> Result<bool> {
        Ok(self.list_models().await?.iter().any(|m| m == model))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GuideError::llm("Failed to list models"));
        }

        let list: ModelList = response.json().await?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
