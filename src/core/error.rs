//! Custom error types for guidegen
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for guidegen operations
#[derive(Error, Debug)]
pub enum GuideError {
    /// LLM connection or API errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model answered with something that is not the JSON we asked for
    #[error("Failed to parse model response: {0}")]
    Parse(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Screenshot decoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Agent-browser not installed
    #[error("agent-browser not found. Install with: npm install -g agent-browser && agent-browser install")]
    AgentBrowserNotFound,

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// Workflow, metadata or served file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A guide is already being generated
    #[error("A guide generation run is already in progress")]
    RunInProgress,

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience Result type for guidegen operations
pub type Result<T> = std::result::Result<T, GuideError>;

impl GuideError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GuideError::parse("expected value").to_string(),
            "Failed to parse model response: expected value"
        );
        assert_eq!(
            GuideError::not_found("workflow.md").to_string(),
            "Not found: workflow.md"
        );
    }

    #[test]
    fn test_with_context() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = GuideError::with_context("writing metadata", io);
        assert_eq!(err.to_string(), "writing metadata: disk full");
    }
}
