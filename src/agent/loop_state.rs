//! Navigator loop state
//!
//! Tracks the ReAct loop: turns taken, observations from tool executions and
//! how many page actions have been reported to the step hook.

use serde::{Deserialize, Serialize};

/// Older observations are cut to this many characters in the prompt
const OLD_OBSERVATION_CHARS: usize = 300;

/// State of the navigator reasoning loop
#[derive(Debug, Clone)]
pub struct AgentLoopState {
    /// Current turn number (0-indexed)
    pub turn: usize,
    /// Maximum allowed turns
    pub max_turns: usize,
    /// Observations collected from tool executions
    pub observations: Vec<Observation>,
    /// Final answer if the agent has completed reasoning
    pub final_answer: Option<String>,
    /// Page actions handed to the step hook so far
    pub steps: usize,
}

impl AgentLoopState {
    /// Create a new loop state with the given max turns
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn: 0,
            max_turns,
            observations: Vec::new(),
            final_answer: None,
            steps: 0,
        }
    }

    /// Check if the loop should continue
    pub fn should_continue(&self) -> bool {
        self.turn < self.max_turns && self.final_answer.is_none()
    }

    /// Format observations for inclusion in the next prompt. Only the latest
    /// one is shown in full; page snapshots go stale after every action.
    pub fn format_observations(&self) -> String {
        if self.observations.is_empty() {
            return String::new();
        }

        let last = self.observations.len() - 1;
        let mut output = String::from("\n\n## Tool Observations:\n");
        for (i, obs) in self.observations.iter().enumerate() {
            let status = if obs.success { "ok" } else { "failed" };
            let body = if i == last {
                obs.output.clone()
            } else {
                truncate(&obs.output, OLD_OBSERVATION_CHARS)
            };
            output.push_str(&format!(
                "\n### Observation {} ({}, {}): {}\n{}\n",
                i + 1,
                obs.tool_name,
                status,
                obs.action,
                body
            ));
        }
        output
    }

    /// Add observations from a batch of tool executions
    pub fn add_observations(&mut self, observations: Vec<Observation>) {
        self.observations.extend(observations);
    }

    /// Claim the next step index (1-based)
    pub fn next_step(&mut self) -> usize {
        self.steps += 1;
        self.steps
    }

    /// Increment the turn counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}

/// An observation from a tool execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Name of the tool that produced this observation
    pub tool_name: String,
    /// What the call did, in words
    pub action: String,
    /// Whether the tool execution was successful
    pub success: bool,
    /// Output from the tool
    pub output: String,
}

impl Observation {
    /// Create a successful observation
    pub fn success(
        tool_name: impl Into<String>,
        action: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            action: action.into(),
            success: true,
            output: output.into(),
        }
    }

    /// Create an error observation
    pub fn error(
        tool_name: impl Into<String>,
        action: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            action: action.into(),
            success: false,
            output: error.into(),
        }
    }

    /// Observation from a tool result
    pub fn from_result(result: crate::core::ToolResult, action: impl Into<String>) -> Self {
        Self {
            tool_name: result.tool_name,
            action: action.into(),
            success: result.success,
            output: result.output,
        }
    }
}
