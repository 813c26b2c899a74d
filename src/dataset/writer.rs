//! On-disk layout of one captured workflow
//!
//! `<root>/<app>/<task>/screenshots/NN_step_NN.png`, `metadata.json` and
//! `workflow.md` all live under the task directory.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::{GuideError, Result};

/// Name of the per-task metadata sidecar
pub const METADATA_FILE: &str = "metadata.json";
/// Name of the rendered guide
pub const WORKFLOW_FILE: &str = "workflow.md";
/// Screenshot subdirectory
pub const SCREENSHOTS_DIR: &str = "screenshots";
/// Value of the `framework` metadata field
pub const FRAMEWORK: &str = "agent-browser";

/// One persisted UI state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedState {
    /// 1-based position in persisted order
    pub step: usize,
    /// Path relative to the task directory
    pub screenshot: String,
    pub description: String,
    pub action_taken: String,
    #[serde(default)]
    pub reasoning: String,
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub task_name: String,
    pub task_query: String,
    pub app_name: String,
    /// RFC 3339 capture time
    pub timestamp: String,
    pub num_states: usize,
    #[serde(default = "default_framework")]
    pub framework: String,
    pub states: Vec<CapturedState>,
}

fn default_framework() -> String {
    FRAMEWORK.to_string()
}

impl WorkflowMetadata {
    pub fn new(
        task_name: impl Into<String>,
        task_query: impl Into<String>,
        app_name: impl Into<String>,
        states: Vec<CapturedState>,
    ) -> Self {
        Self::at(task_name, task_query, app_name, states, Local::now())
    }

    /// Same as `new` with an explicit capture time
    pub fn at(
        task_name: impl Into<String>,
        task_query: impl Into<String>,
        app_name: impl Into<String>,
        states: Vec<CapturedState>,
        captured: DateTime<Local>,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            task_query: task_query.into(),
            app_name: app_name.into(),
            timestamp: captured.to_rfc3339(),
            num_states: states.len(),
            framework: default_framework(),
            states,
        }
    }

    /// Read and decode a `metadata.json`
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GuideError::not_found(path.display().to_string())
            } else {
                GuideError::from(e)
            }
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Filename for the n-th persisted screenshot
pub fn screenshot_file_name(index: usize) -> String {
    format!("{:02}_step_{:02}.png", index, index)
}

/// Writes one task directory
#[derive(Debug, Clone)]
pub struct DatasetWriter {
    app_name: String,
    task_name: String,
    task_dir: PathBuf,
}

impl DatasetWriter {
    /// Create `<root>/<app>/<task>/screenshots`, removing screenshots left by
    /// an earlier run of the same task so numbering stays contiguous.
    pub fn create(root: &Path, app_name: &str, task_name: &str) -> Result<Self> {
        let task_dir = root.join(app_name).join(task_name);
        let screenshots = task_dir.join(SCREENSHOTS_DIR);
        fs::create_dir_all(&screenshots)
            .map_err(|e| GuideError::with_context(format!("creating {}", screenshots.display()), e))?;

        let mut removed = 0usize;
        for entry in fs::read_dir(&screenshots)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, dir = %screenshots.display(), "cleared stale screenshots");
        }

        Ok(Self {
            app_name: app_name.to_string(),
            task_name: task_name.to_string(),
            task_dir,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn task_dir(&self) -> &Path {
        &self.task_dir
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.task_dir.join(SCREENSHOTS_DIR)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.task_dir.join(METADATA_FILE)
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.task_dir.join(WORKFLOW_FILE)
    }

    /// Write PNG bytes as screenshot number `index`. Returns the path
    /// relative to the task directory.
    pub fn save_screenshot(&self, index: usize, png: &[u8]) -> Result<String> {
        let name = screenshot_file_name(index);
        let path = self.screenshots_dir().join(&name);
        fs::write(&path, png)
            .map_err(|e| GuideError::with_context(format!("writing {}", path.display()), e))?;
        Ok(format!("{}/{}", SCREENSHOTS_DIR, name))
    }

    /// Write `metadata.json`
    pub fn write_metadata(&self, metadata: &WorkflowMetadata) -> Result<PathBuf> {
        let path = self.metadata_path();
        let json = serde_json::to_string_pretty(metadata)?;
        fs::write(&path, json)?;
        info!(path = %path.display(), states = metadata.num_states, "saved workflow metadata");
        Ok(path)
    }
}
