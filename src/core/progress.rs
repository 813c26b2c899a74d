//! Progress events emitted while a guide is generated
//!
//! The HTTP facade fans these out to WebSocket clients; the CLI just logs them.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// A progress update for whoever is watching a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Intermediate status
    Status {
        message: String,
        stage: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        app_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_name: Option<String>,
    },
    /// The guide was written
    Complete {
        message: String,
        task_name: String,
        app_name: String,
        output_dir: String,
        screenshots: Vec<String>,
        workflow_file: Option<String>,
    },
    /// The run failed
    Error { message: String },
}

impl ProgressEvent {
    /// Status event without app/task context
    pub fn status(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
            stage: stage.into(),
            app_name: None,
            task_name: None,
        }
    }

    /// Error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that writes events to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Status { message, stage, .. } => info!(%stage, "{}", message),
            ProgressEvent::Complete {
                message,
                output_dir,
                ..
            } => info!(%output_dir, "{}", message),
            ProgressEvent::Error { message } => error!("{}", message),
        }
    }
}

/// Sink that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}
