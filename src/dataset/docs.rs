//! Markdown rendering of captured workflows
//!
//! Step titles come from a small ordered rule table matched against the
//! action text. The first matching rule wins; it is a best-effort label, not
//! a semantic guarantee.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::info;

use crate::core::Result;
use crate::dataset::index::DatasetSummary;
use crate::dataset::writer::{WorkflowMetadata, WORKFLOW_FILE};

/// A step-title rule. Matches when the action contains `requires` (if set)
/// and at least one of `any`.
#[derive(Debug, Clone, Copy)]
pub struct TitleRule {
    pub requires: Option<&'static str>,
    pub any: &'static [&'static str],
    pub title: &'static str,
}

const fn rule(
    requires: Option<&'static str>,
    any: &'static [&'static str],
    title: &'static str,
) -> TitleRule {
    TitleRule {
        requires,
        any,
        title,
    }
}

/// Evaluated top to bottom against the lowercased action
pub const TITLE_RULES: &[TitleRule] = &[
    rule(Some("click"), &["search", "input"], "Enter Search Query"),
    rule(Some("click"), &["button"], "Click Action Button"),
    rule(Some("click"), &["link"], "Navigate to Page"),
    rule(None, &["click"], "Click Element"),
    rule(None, &["type", "input", "fill"], "Enter Information"),
    rule(None, &["go to", "navigate"], "Navigate to Page"),
    rule(None, &["scroll"], "Scroll Page"),
    rule(None, &["wait"], "Wait for Page Load"),
    rule(None, &["search"], "Search"),
    rule(None, &["open"], "Open Application"),
    rule(None, &["result", "display"], "View Results"),
    rule(None, &["complete", "done"], "Task Completed"),
];

impl TitleRule {
    fn matches(&self, action: &str) -> bool {
        self.requires.map_or(true, |word| action.contains(word))
            && self.any.iter().any(|word| action.contains(word))
    }
}

/// Human-readable title for a step
pub fn step_title(step: usize, action: &str) -> String {
    let action = action.to_lowercase();
    TITLE_RULES
        .iter()
        .find(|r| r.matches(&action))
        .map(|r| r.title.to_string())
        .unwrap_or_else(|| format!("Step {}", step))
}

fn element_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s*(\(e\d+\)|\[ref=e\d+\])").expect("valid regex"))
}

/// Action text fit for the guide, or empty when it is too noisy to show
pub fn clean_action(action: &str) -> String {
    let stripped = element_ref_pattern().replace_all(action.trim(), "");
    let stripped = stripped.trim();

    if stripped.len() < 200 && !stripped.contains('[') && !stripped.contains('(') {
        stripped.to_string()
    } else {
        String::new()
    }
}

/// `search_for_videos` -> `Search For Videos`
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

fn workflow_title(metadata: &WorkflowMetadata) -> String {
    let query = metadata.task_query.trim();
    if query.ends_with('?') {
        query.to_string()
    } else {
        title_case(&metadata.task_name.replace('_', " "))
    }
}

/// Renders `workflow.md` files and the dataset README
#[derive(Debug, Clone)]
pub struct DocsGenerator {
    dataset_root: PathBuf,
}

impl DocsGenerator {
    pub fn new(dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
        }
    }

    /// Markdown for one workflow
    pub fn render_workflow(metadata: &WorkflowMetadata) -> String {
        let title = workflow_title(metadata);
        let mut md = format!(
            "# {title}\n\n**Application:** {app}\n\n---\n\n## Overview\n\n\
             This guide demonstrates **{lower}** through {count} step-by-step screenshots.\n\n\
             ## Steps\n\n",
            app = title_case(&metadata.app_name),
            lower = title.to_lowercase(),
            count = metadata.num_states,
        );

        for state in &metadata.states {
            let heading = step_title(state.step, &state.action_taken);
            md.push_str(&format!("### {}. {}\n\n", state.step, heading));

            if !state.screenshot.is_empty() {
                md.push_str(&format!("![{}]({})\n\n", heading, state.screenshot));
            }

            let action = clean_action(&state.action_taken);
            if action.len() > 5 {
                md.push_str(&format!("_{}_\n\n", action));
            }

            md.push_str("---\n\n");
        }

        md.push_str(&format!(
            "## Metadata\n\n- **Captured:** {}\n- **Total States:** {}\n- **App:** {}\n\n",
            metadata.timestamp, metadata.num_states, metadata.app_name
        ));
        md
    }

    /// Write `workflow.md` into `task_dir`
    pub fn write_workflow(&self, task_dir: &Path, metadata: &WorkflowMetadata) -> Result<PathBuf> {
        let path = task_dir.join(WORKFLOW_FILE);
        fs::write(&path, Self::render_workflow(metadata))?;
        info!(path = %path.display(), "generated workflow documentation");
        Ok(path)
    }

    /// Markdown for the dataset README
    pub fn render_readme(summary: &DatasetSummary) -> String {
        let mut md = format!(
            "# AI UI Navigator Dataset\n\n\
             This dataset contains captured UI workflows for various web applications, \
             demonstrating how to perform common tasks.\n\n\
             ## Overview\n\n\
             - **Total Workflows:** {}\n\
             - **Total UI States Captured:** {}\n\
             - **Applications:** {}\n\n",
            summary.total_workflows,
            summary.total_states_captured,
            summary.apps.len()
        );

        md.push_str(
            "## Dataset Structure\n\n\
             Each workflow is organized as follows:\n\n\
             ```\n\
             dataset/\n\
             ├── {app_name}/\n\
             │   ├── {task_name}/\n\
             │   │   ├── screenshots/\n\
             │   │   │   ├── 01_step_01.png\n\
             │   │   │   ├── 02_step_02.png\n\
             │   │   │   └── ...\n\
             │   │   ├── metadata.json\n\
             │   │   └── workflow.md\n\
             ```\n\n\
             ## Applications and Workflows\n\n",
        );

        for (app, data) in &summary.apps {
            md.push_str(&format!("### {}\n\n", title_case(app)));
            md.push_str(&format!("**Total Workflows:** {}\n\n", data.num_workflows));
            md.push_str(&format!("**Total States:** {}\n\n", data.total_states));
            md.push_str("#### Workflows:\n\n");

            for workflow in &data.workflows {
                md.push_str(&format!(
                    "- **{}**\n  - Query: _{}_\n  - States Captured: {}\n  - [View Workflow]({}/{})\n\n",
                    title_case(&workflow.task_name.replace('_', " ")),
                    workflow.task_query,
                    workflow.num_states,
                    workflow.path,
                    WORKFLOW_FILE
                ));
            }
            md.push('\n');
        }

        md.push_str(
            "## About This Dataset\n\n\
             This dataset was generated by an LLM-driven browser agent that:\n\n\
             1. Receives natural language task queries (e.g., \"How do I create a project?\")\n\
             2. Navigates the web application through the agent-browser CLI\n\
             3. Captures screenshots only when the UI state changes significantly\n\
             4. Pauses for manual login when an auth page appears\n\
             5. Generates documentation for each workflow\n\n\
             ## Dataset Usage\n\n\
             Each workflow includes:\n\n\
             - **screenshots/**: Numbered screenshots showing each UI state\n\
             - **metadata.json**: Structured data about each step\n\
             - **workflow.md**: Human-readable documentation with embedded images\n",
        );
        md
    }

    /// Write the dataset `README.md`
    pub fn write_readme(&self, summary: &DatasetSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dataset_root)?;
        let path = self.dataset_root.join("README.md");
        fs::write(&path, Self::render_readme(summary))?;
        info!(path = %path.display(), "generated dataset README");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::writer::CapturedState;
    use tempfile::TempDir;

    fn state(step: usize, action: &str) -> CapturedState {
        CapturedState {
            step,
            screenshot: format!("screenshots/{:02}_step_{:02}.png", step, step),
            description: String::new(),
            action_taken: action.to_string(),
            reasoning: String::new(),
        }
    }

    #[test]
    fn test_step_titles_first_match_wins() {
        assert_eq!(step_title(1, "Click searchbox \"Search\" (e3)"), "Enter Search Query");
        assert_eq!(step_title(2, "Click button \"Create\" (e7)"), "Click Action Button");
        assert_eq!(step_title(3, "Click link \"Trending\" (e9)"), "Navigate to Page");
        assert_eq!(step_title(4, "Click \"Menu\""), "Click Element");
        assert_eq!(step_title(5, "Type \"cats\" into textbox (e3)"), "Enter Information");
        assert_eq!(step_title(6, "Navigate to https://github.com"), "Navigate to Page");
        assert_eq!(step_title(7, "Scroll down 500px"), "Scroll Page");
        assert_eq!(step_title(8, "Wait for network idle"), "Wait for Page Load");
        assert_eq!(step_title(9, "Search"), "Search");
        assert_eq!(step_title(10, "Task completed"), "Task Completed");
        assert_eq!(step_title(11, "Press Enter"), "Step 11");
    }

    #[test]
    fn test_clean_action() {
        assert_eq!(
            clean_action("Click button \"Search\" (e5)"),
            "Click button \"Search\""
        );
        assert_eq!(clean_action("ok [weird] (stuff)"), "");
        assert_eq!(clean_action(&"x".repeat(250)), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("search for videos"), "Search For Videos");
        assert_eq!(title_case("youtube"), "Youtube");
        assert_eq!(title_case("stack-overflow"), "Stack-Overflow");
    }

    #[test]
    fn test_render_workflow() {
        let metadata = WorkflowMetadata {
            task_name: "search_for_videos".into(),
            task_query: "How to search for videos on YouTube?".into(),
            app_name: "youtube".into(),
            timestamp: "2024-05-01T10:00:00+00:00".into(),
            num_states: 2,
            framework: "agent-browser".into(),
            states: vec![
                state(1, "Type \"cats\" into searchbox \"Search\" (e3)"),
                state(2, "Done"),
            ],
        };

        let md = DocsGenerator::render_workflow(&metadata);
        assert!(md.starts_with("# How to search for videos on YouTube?\n"));
        assert!(md.contains("**Application:** Youtube"));
        assert!(md.contains("through 2 step-by-step screenshots"));
        assert!(md.contains("### 1. Enter Information\n\n![Enter Information](screenshots/01_step_01.png)"));
        assert!(md.contains("_Type \"cats\" into searchbox \"Search\"_"));
        assert!(md.contains("### 2. Task Completed"));
        // too short to repeat under the heading
        assert!(!md.contains("_Done_"));
        assert!(md.contains("- **Total States:** 2"));
    }

    #[test]
    fn test_title_falls_back_to_task_name() {
        let metadata = WorkflowMetadata {
            task_name: "search_issues".into(),
            task_query: "search issues".into(),
            app_name: "github".into(),
            timestamp: String::new(),
            num_states: 0,
            framework: "agent-browser".into(),
            states: Vec::new(),
        };
        assert!(DocsGenerator::render_workflow(&metadata).starts_with("# Search Issues\n"));
    }

    #[test]
    fn test_write_workflow() {
        let dir = TempDir::new().unwrap();
        let metadata = WorkflowMetadata::new("t", "q?", "app", vec![state(1, "Scroll down")]);
        let path = DocsGenerator::new(dir.path())
            .write_workflow(dir.path(), &metadata)
            .unwrap();
        assert_eq!(path, dir.path().join("workflow.md"));
        assert!(fs::read_to_string(path).unwrap().contains("### 1. Scroll Page"));
    }
}
