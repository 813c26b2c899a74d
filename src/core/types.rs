//! Shared types used across guidegen modules
//!
//! Chat messages and tool definitions for the LLM layer, plus the parsed
//! query that every later stage of a run keys off.

use serde::{Deserialize, Serialize};

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: String,
    /// Content of the message
    pub content: String,
    /// Optional tool calls made by the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    fn with_role(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
            tool_calls: None,
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role("user", content)
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role("assistant", content)
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role("system", content)
    }
}

/// A tool call made by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke
    pub name: String,
    /// JSON arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Get a string argument by key
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.arguments
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Get an unsigned integer argument by key, accepting numeric strings
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        let value = self.arguments.get(key)?;
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
    }

    /// Get a boolean argument by key
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }
}

/// Definition of a tool that can be called by the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Type of tool (always "function" for now)
    #[serde(rename = "type")]
    pub tool_type: String,
    /// Function details
    pub function: FunctionDefinition,
}

/// Function definition within a tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Name of the function
    pub name: String,
    /// Description of what the function does
    pub description: String,
    /// JSON Schema for the parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new function tool definition
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Result of executing a tool
#[derive(Debug, Clone)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Whether the execution was successful
    pub success: bool,
    /// Output from the tool
    pub output: String,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            output: output.into(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            output: error.into(),
        }
    }
}

/// What the task parser extracted from a question. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Lowercase single-word application name, e.g. `github`
    pub app: String,
    /// Action phrase, e.g. `search issues`
    pub task: String,
    /// Base URL the navigator starts from
    pub url: String,
    /// Whether the task needs a logged-in session
    pub requires_auth: bool,
}

impl ParsedQuery {
    /// Directory-safe task name: lowercase, spaces to underscores
    pub fn task_slug(&self) -> String {
        slugify(&self.task)
    }
}

/// Lowercase, spaces to `_`, anything outside `[a-z0-9_-]` dropped
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_call_args() {
        let call = ToolCall::new(
            "browser_scroll",
            serde_json::json!({"direction": "down", "pixels": "400", "full": true}),
        );
        assert_eq!(call.get_string("direction").as_deref(), Some("down"));
        assert_eq!(call.get_u64("pixels"), Some(400));
        assert_eq!(call.get_bool("full"), Some(true));
        assert_eq!(call.get_string("missing"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Create a Project"), "create_a_project");
        assert_eq!(slugify(" search issues/../x "), "search_issuesx");
        assert_eq!(slugify("star a repo!"), "star_a_repo");
    }

    #[test]
    fn test_task_slug() {
        let parsed = ParsedQuery {
            app: "youtube".to_string(),
            task: "search for videos".to_string(),
            url: "https://www.youtube.com".to_string(),
            requires_auth: false,
        };
        assert_eq!(parsed.task_slug(), "search_for_videos");
    }
}
