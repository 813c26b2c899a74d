//! Tool registry - manages and dispatches tool calls
//!
//! Holds the browser tool definitions offered to the navigator model and
//! routes the model's calls to the agent-browser executor.

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::{Result, ToolCall, ToolDefinition, ToolResult};
use crate::tools::browser::BrowserExecutor;

/// Something that can run the navigator's tool calls
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Definitions offered to the model, in a stable order
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run one call. Argument problems come back as a failed `ToolResult`.
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;

    /// Human-readable description of a call, used as the step's action text
    fn describe(&self, call: &ToolCall) -> String;
}

/// Whether a tool changes what the page shows. Only these trigger a capture.
pub fn is_page_action(name: &str) -> bool {
    matches!(
        name,
        "browser_url"
            | "browser_click"
            | "browser_fill"
            | "browser_press"
            | "browser_scroll"
            | "browser_wait"
    )
}

/// Describe a call given the snapshot label of its target element, if known
pub fn describe_action(call: &ToolCall, element: Option<String>) -> String {
    let ref_id = call
        .get_string("ref")
        .map(|r| r.trim().trim_start_matches('@').to_string())
        .unwrap_or_default();
    let target = match element {
        Some(label) => format!("{} ({})", label, ref_id),
        None => format!("element {}", ref_id),
    };

    match call.name.as_str() {
        "browser_url" => format!(
            "Navigate to {}",
            call.get_string("url").unwrap_or_default()
        ),
        "browser_click" => format!("Click {}", target),
        "browser_fill" => format!(
            "Type \"{}\" into {}",
            call.get_string("text").unwrap_or_default(),
            target
        ),
        "browser_press" => format!("Press {}", call.get_string("key").unwrap_or_default()),
        "browser_scroll" => {
            let direction = call
                .get_string("direction")
                .unwrap_or_else(|| "down".to_string());
            match call.get_u64("pixels") {
                Some(px) => format!("Scroll {} {}px", direction, px),
                None => format!("Scroll {}", direction),
            }
        }
        "browser_wait" => match call.get_string("text") {
            Some(text) => format!("Wait for \"{}\" to appear", text),
            None => "Wait for page load".to_string(),
        },
        "browser_snapshot" => "Inspect page elements".to_string(),
        "browser_get_text" => format!("Read text of {}", target),
        other => other.to_string(),
    }
}

/// Registry of the browser tools
pub struct ToolRegistry {
    /// Tool definitions in registration order
    definitions: Vec<ToolDefinition>,
    /// Browser executor instance
    browser: Arc<BrowserExecutor>,
}

impl ToolRegistry {
    /// Create a registry driving the given browser session
    pub fn new(browser: Arc<BrowserExecutor>) -> Self {
        let mut registry = Self {
            definitions: Vec::new(),
            browser,
        };
        registry.register_browser_tools();
        registry
    }

    /// Register browser automation tools
    fn register_browser_tools(&mut self) {
        self.register(ToolDefinition::function(
            "browser_url",
            "Navigate to a URL and get the page structure for analysis",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "The URL to navigate to"
                    },
                    "wait_for_load": {
                        "type": "boolean",
                        "description": "Wait for network idle before snapshot"
                    }
                },
                "required": ["url"]
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_snapshot",
            "Get current page accessibility tree with interactive element refs",
            serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_click",
            "Click an element on the page by its ref from snapshot",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "ref": {
                        "type": "string",
                        "description": "Element ref from snapshot (e.g., e1, e2)"
                    }
                },
                "required": ["ref"]
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_fill",
            "Fill text into an input field by its ref",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "ref": {
                        "type": "string",
                        "description": "Element ref from snapshot"
                    },
                    "text": {
                        "type": "string",
                        "description": "Text to enter"
                    }
                },
                "required": ["ref", "text"]
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_press",
            "Press a keyboard key, e.g. Enter to submit a search",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "Key name such as Enter, Escape or Tab"
                    }
                },
                "required": ["key"]
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_scroll",
            "Scroll the page",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "direction": {
                        "type": "string",
                        "enum": ["up", "down"],
                        "description": "Scroll direction"
                    },
                    "pixels": {
                        "type": "integer",
                        "description": "How far to scroll (optional)"
                    }
                },
                "required": ["direction"]
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_wait",
            "Wait for the page to finish loading, or for some text to appear",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": {
                        "type": "string",
                        "description": "Text to wait for (optional)"
                    }
                }
            }),
        ));

        self.register(ToolDefinition::function(
            "browser_get_text",
            "Get text content from an element",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "ref": {
                        "type": "string",
                        "description": "Element ref from snapshot"
                    }
                },
                "required": ["ref"]
            }),
        ));
    }

    /// Register a tool definition, replacing one with the same name
    pub fn register(&mut self, definition: ToolDefinition) {
        self.definitions
            .retain(|d| d.function.name != definition.function.name);
        self.definitions.push(definition);
    }

    /// Get the browser executor
    pub fn browser_executor(&self) -> &Arc<BrowserExecutor> {
        &self.browser
    }

    /// Execute a browser tool
    async fn execute_browser_tool(&self, tool_call: &ToolCall) -> Result<ToolResult> {
        let browser = &self.browser;
        let name = tool_call.name.as_str();

        let require = |key: &str| {
            tool_call
                .get_string(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ToolResult::failure(name, format!("Missing required argument '{}'", key))
                })
        };

        let result = match name {
            "browser_url" => match require("url") {
                Ok(url) => {
                    let wait = tool_call.get_bool("wait_for_load").unwrap_or(true);
                    browser.open(&url, wait).await?
                }
                Err(missing) => missing,
            },
            "browser_snapshot" => browser.snapshot().await?,
            "browser_click" => match require("ref") {
                Ok(ref_id) => browser.click(&ref_id).await?,
                Err(missing) => missing,
            },
            "browser_fill" => match (require("ref"), tool_call.get_string("text")) {
                (Ok(ref_id), Some(text)) => browser.fill(&ref_id, &text).await?,
                (Err(missing), _) => missing,
                (_, None) => ToolResult::failure(name, "Missing required argument 'text'"),
            },
            "browser_press" => match require("key") {
                Ok(key) => browser.press(&key).await?,
                Err(missing) => missing,
            },
            "browser_scroll" => {
                let direction = tool_call
                    .get_string("direction")
                    .unwrap_or_else(|| "down".to_string());
                browser
                    .scroll(&direction, tool_call.get_u64("pixels"))
                    .await?
            }
            "browser_wait" => match tool_call.get_string("text") {
                Some(text) if !text.trim().is_empty() => browser.wait_for_text(&text).await?,
                _ => browser.wait_for_load().await?,
            },
            "browser_get_text" => match require("ref") {
                Ok(ref_id) => browser.get_text(&ref_id).await?,
                Err(missing) => missing,
            },
            _ => ToolResult::failure(name, format!("Unknown browser tool: {}", name)),
        };

        Ok(result)
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        if !self.definitions.iter().any(|d| d.function.name == call.name) {
            return Ok(ToolResult::failure(
                &call.name,
                format!("Unknown tool: {}", call.name),
            ));
        }
        self.execute_browser_tool(call).await
    }

    fn describe(&self, call: &ToolCall) -> String {
        let element = call
            .get_string("ref")
            .and_then(|r| self.browser.describe_ref(&r));
        describe_action(call, element)
    }
}
