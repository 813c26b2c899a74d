//! Whole-dataset views: workflow listing, summary and doc regeneration

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::Result;
use crate::dataset::docs::DocsGenerator;
use crate::dataset::writer::{WorkflowMetadata, METADATA_FILE};

/// A workflow found on disk
#[derive(Debug, Clone)]
pub struct WorkflowEntry {
    /// `<app>/<task>` relative to the dataset root
    pub path: String,
    pub task_dir: PathBuf,
    pub metadata: WorkflowMetadata,
}

/// Summary line for one workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub task_name: String,
    pub task_query: String,
    pub num_states: usize,
    pub path: String,
}

/// Per-app totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSummary {
    pub num_workflows: usize,
    pub total_states: usize,
    pub workflows: Vec<WorkflowSummary>,
}

/// Contents of `summary.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub total_workflows: usize,
    pub total_states_captured: usize,
    pub apps: BTreeMap<String, AppSummary>,
    #[serde(default)]
    pub generated_at: String,
}

/// Read-side view over the dataset root
#[derive(Debug, Clone)]
pub struct DatasetIndex {
    root: PathBuf,
}

fn subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'))
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

impl DatasetIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every `<app>/<task>/metadata.json` under the root, sorted by path.
    /// Unreadable metadata is skipped with a warning.
    pub fn list_workflows(&self) -> Result<Vec<WorkflowEntry>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for app_dir in subdirs(&self.root)? {
            for task_dir in subdirs(&app_dir)? {
                let metadata_path = task_dir.join(METADATA_FILE);
                if !metadata_path.is_file() {
                    continue;
                }
                let metadata = match WorkflowMetadata::load(&metadata_path) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(path = %metadata_path.display(), error = %e, "skipping workflow");
                        continue;
                    }
                };
                let path = task_dir
                    .strip_prefix(&self.root)
                    .unwrap_or(&task_dir)
                    .to_string_lossy()
                    .replace('\\', "/");
                entries.push(WorkflowEntry {
                    path,
                    task_dir,
                    metadata,
                });
            }
        }
        Ok(entries)
    }

    /// Totals grouped by app
    pub fn summary(&self) -> Result<DatasetSummary> {
        let workflows = self.list_workflows()?;
        let mut summary = DatasetSummary {
            generated_at: Local::now().to_rfc3339(),
            ..Default::default()
        };

        for entry in workflows {
            let num_states = entry.metadata.num_states;
            summary.total_workflows += 1;
            summary.total_states_captured += num_states;

            let app = summary.apps.entry(entry.metadata.app_name.clone()).or_default();
            app.num_workflows += 1;
            app.total_states += num_states;
            app.workflows.push(WorkflowSummary {
                task_name: entry.metadata.task_name,
                task_query: entry.metadata.task_query,
                num_states,
                path: entry.path,
            });
        }
        Ok(summary)
    }

    /// Write `summary.json` at the root
    pub fn save_summary(&self) -> Result<(PathBuf, DatasetSummary)> {
        let summary = self.summary()?;
        fs::create_dir_all(&self.root)?;
        let path = self.root.join("summary.json");
        fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
        info!(path = %path.display(), workflows = summary.total_workflows, "saved dataset summary");
        Ok((path, summary))
    }

    /// Regenerate every `workflow.md`, `summary.json` and the README.
    /// Returns how many workflow documents were written.
    pub fn generate_all_docs(&self) -> Result<usize> {
        let docs = DocsGenerator::new(&self.root);
        let workflows = self.list_workflows()?;
        for entry in &workflows {
            docs.write_workflow(&entry.task_dir, &entry.metadata)?;
        }

        let (_, summary) = self.save_summary()?;
        docs.write_readme(&summary)?;
        Ok(workflows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::writer::{CapturedState, DatasetWriter};
    use tempfile::TempDir;

    fn seed(root: &Path, app: &str, task: &str, states: usize) {
        let writer = DatasetWriter::create(root, app, task).unwrap();
        let states = (1..=states)
            .map(|step| CapturedState {
                step,
                screenshot: writer.save_screenshot(step, b"png").unwrap(),
                description: String::new(),
                action_taken: "Scroll down".into(),
                reasoning: String::new(),
            })
            .collect();
        writer
            .write_metadata(&WorkflowMetadata::new(task, task.replace('_', " "), app, states))
            .unwrap();
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = DatasetIndex::new(dir.path().join("nope"));
        assert!(index.list_workflows().unwrap().is_empty());
        assert_eq!(index.summary().unwrap().total_workflows, 0);
    }

    #[test]
    fn test_summary_groups_by_app() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), "github", "search_issues", 3);
        seed(dir.path(), "github", "create_repo", 2);
        seed(dir.path(), "youtube", "search_for_videos", 4);
        fs::create_dir_all(dir.path().join(".cache").join("x")).unwrap();
        fs::create_dir_all(dir.path().join("notion").join("empty_task")).unwrap();

        let summary = DatasetIndex::new(dir.path()).summary().unwrap();
        assert_eq!(summary.total_workflows, 3);
        assert_eq!(summary.total_states_captured, 9);
        assert_eq!(summary.apps.len(), 2);

        let github = &summary.apps["github"];
        assert_eq!(github.num_workflows, 2);
        assert_eq!(github.total_states, 5);
        assert_eq!(github.workflows[0].path, "github/create_repo");
    }

    #[test]
    fn test_corrupt_metadata_is_skipped() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), "github", "search_issues", 1);
        let broken = dir.path().join("github").join("broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(METADATA_FILE), "{").unwrap();

        assert_eq!(DatasetIndex::new(dir.path()).list_workflows().unwrap().len(), 1);
    }

    #[test]
    fn test_generate_all_docs() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), "youtube", "search_for_videos", 2);

        let written = DatasetIndex::new(dir.path()).generate_all_docs().unwrap();
        assert_eq!(written, 1);

        let workflow = dir.path().join("youtube/search_for_videos/workflow.md");
        assert!(fs::read_to_string(workflow).unwrap().contains("### 2. Scroll Page"));

        let readme = fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(readme.contains("- **Total Workflows:** 1"));
        assert!(readme.contains("[View Workflow](youtube/search_for_videos/workflow.md)"));

        let summary: DatasetSummary =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary.total_states_captured, 2);
    }
}
