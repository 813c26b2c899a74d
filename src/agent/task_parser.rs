//! Task parser
//!
//! Turns a free-text question into a `ParsedQuery` with one LLM call. The
//! model's answer must be a JSON object, optionally wrapped in a code fence.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::{GuideError, Message, ParsedQuery, Result};
use crate::dataset::UrlCache;
use crate::llm::{GenerateOptions, LLMProvider};

/// Raw shape of the model's answer
#[derive(Debug, Deserialize)]
struct RawQuery {
    app: String,
    task: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    requires_auth: bool,
}

/// LLM-backed question parser
pub struct TaskParser {
    llm: Arc<dyn LLMProvider>,
    model: String,
    urls: Arc<UrlCache>,
}

impl TaskParser {
    pub fn new(llm: Arc<dyn LLMProvider>, model: impl Into<String>, urls: Arc<UrlCache>) -> Self {
        Self {
            llm,
            model: model.into(),
            urls,
        }
    }

    fn prompt(question: &str) -> String {
        format!(
            r#"Extract the application name and task from this question:

Question: "{question}"

Return a JSON object with:
- app: The application name (lowercase, one word like "linear", "notion", "github", etc.)
- task: The task to perform (action phrase like "create a project", "filter a database", etc.)
- url: The application's base URL if you know it, otherwise null
- requires_auth: true if the task needs a signed-in account (creating, editing or managing your own data), false for public browsing or searching

Examples:
- "How do I create a project in Linear?" -> {{"app": "linear", "task": "create a project", "url": "https://linear.app", "requires_auth": true}}
- "How do I filter a database in Notion?" -> {{"app": "notion", "task": "filter a database", "url": "https://www.notion.so", "requires_auth": true}}
- "How to search for videos on YouTube?" -> {{"app": "youtube", "task": "search for videos", "url": "https://www.youtube.com", "requires_auth": false}}

Return ONLY the JSON object."#
        )
    }

    /// Parse a question. Malformed model output is a `Parse` error.
    pub async fn parse(&self, question: &str) -> Result<ParsedQuery> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GuideError::parse("question is empty"));
        }

        let messages = vec![Message::user(Self::prompt(question))];
        let response = self
            .llm
            .chat(
                &self.model,
                &messages,
                Some(GenerateOptions {
                    temperature: Some(0.3),
                    json_mode: true,
                    ..Default::default()
                }),
            )
            .await?;

        debug!(content = %response.content, "parser response");
        let raw: RawQuery = serde_json::from_str(strip_code_fence(&response.content))
            .map_err(|e| GuideError::parse(format!("model returned invalid JSON: {}", e)))?;

        let app = normalize_app(&raw.app);
        let task = raw.task.trim().to_string();
        if app.is_empty() || task.is_empty() {
            return Err(GuideError::parse("model returned an empty app or task"));
        }

        let url = self.resolve_url(&app, raw.url.as_deref());
        let parsed = ParsedQuery {
            app,
            task,
            url,
            requires_auth: raw.requires_auth,
        };
        info!(
            app = %parsed.app,
            task = %parsed.task,
            url = %parsed.url,
            requires_auth = parsed.requires_auth,
            "parsed question"
        );
        Ok(parsed)
    }

    /// A usable model URL wins and is remembered; otherwise fall back
    fn resolve_url(&self, app: &str, suggested: Option<&str>) -> String {
        let suggested = suggested
            .and_then(|u| Url::parse(u.trim()).ok())
            .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
            .map(|u| u.as_str().trim_end_matches('/').to_string());

        match suggested {
            Some(url) => {
                if let Err(e) = self.urls.insert(app, &url) {
                    warn!(%app, error = %e, "could not update url cache");
                }
                url
            }
            None => self.urls.resolve(app),
        }
    }
}

/// Remove a surrounding ```json or ``` fence
pub fn strip_code_fence(content: &str) -> &str {
    let content = content.trim();
    let inner = if let Some((_, rest)) = content.split_once("```json") {
        rest
    } else if let Some((_, rest)) = content.split_once("```") {
        rest
    } else {
        return content;
    };
    inner.split("```").next().unwrap_or(inner).trim()
}

/// Lowercase single token, e.g. "Google Docs" → "googledocs"
pub fn normalize_app(app: &str) -> String {
    app.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect()
}
