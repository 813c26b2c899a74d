//! Browser navigator
//!
//! Drives the browser toward the parsed task with a ReAct-style loop
//! (Thought → Action → Observation). Tool calls run one at a time, and after
//! every page action the injected `StepHook` is awaited before the next call
//! is issued. The hook observes; it never navigates.

use async_trait::async_trait;
use std::sync::Arc;

use crate::agent::loop_state::{AgentLoopState, Observation};
use crate::core::{GuideError, Message, ParsedQuery, Result};
use crate::llm::{GenerateOptions, LLMProvider, LLMResponse};
use crate::tools::{is_page_action, ToolExecutor};

/// Action text reported for the closing step
pub const DONE_ACTION: &str = "Task completed";

/// One reported agent step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStep {
    /// 1-based, counts every hook invocation
    pub step_index: usize,
    /// What was done, e.g. `Click button "Search" (e5)`
    pub action: String,
    /// The model's reasoning for the turn, or its final answer for `done`
    pub summary: String,
}

/// Called after every page action and once when the navigator finishes
#[async_trait]
pub trait StepHook: Send {
    async fn on_step(&mut self, step: &AgentStep);
}

/// Hook that ignores every step
#[derive(Debug, Default)]
pub struct NoopHook;

#[async_trait]
impl StepHook for NoopHook {
    async fn on_step(&mut self, _step: &AgentStep) {}
}

/// How a navigation run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub turns: usize,
    /// Hook invocations, including the final `done`
    pub steps: usize,
    pub final_answer: Option<String>,
    /// False when the turn budget ran out
    pub completed: bool,
}

/// LLM-driven browser navigator
pub struct Navigator {
    llm: Arc<dyn LLMProvider>,
    model: String,
    tools: Arc<dyn ToolExecutor>,
    max_turns: usize,
    debug: bool,
}

const SYSTEM_PROMPT: &str = r#"You are a browser agent demonstrating how to do a task in a web application. Follow the ReAct pattern:
1. THINK about what you need to do.
2. ACT by calling exactly the browser tools needed for the next step.
3. OBSERVE the results and continue, or reply with a short summary when done.

## Browser Tools
- `browser_url`: Navigate to a URL. Returns a snapshot of interactive elements.
- `browser_snapshot`: Refresh the list of interactive elements with [ref=eN] tags.
- `browser_click`: Click an element. Args: {"ref": "e8"}
- `browser_fill`: Type text into an input. Args: {"ref": "e5", "text": "search query"}
- `browser_press`: Press a key, e.g. {"key": "Enter"} to submit.
- `browser_scroll`: Scroll the page. Args: {"direction": "down", "pixels": 600}
- `browser_wait`: Wait for loading, or for {"text": "..."} to appear.
- `browser_get_text`: Read the text of an element.

## CRITICAL: Element References
When a snapshot shows `button "Search" [ref=e12]`, use {"ref": "e12"}.
Always use refs from the LATEST observation. Never invent refs or use URLs as refs.

## Rules
- If a modal, popup, cookie banner or dialog blocks the page, close it first.
- If a login page appears, a human will log in while you wait. Take a fresh snapshot and carry on.
- The goal is to SHOW how the task is done, not necessarily finish every sub-step.
- Reply without tool calls only when the task has been demonstrated."#;

impl Navigator {
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        tools: Arc<dyn ToolExecutor>,
        max_turns: usize,
    ) -> Self {
        Self {
            llm,
            model: model.into(),
            tools,
            max_turns,
            debug: false,
        }
    }

    /// Print extra diagnostics to stderr
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Task instructions for a parsed query
    pub fn task_prompt(parsed: &ParsedQuery) -> String {
        let lower = parsed.task.trim();
        let mut chars = lower.chars();
        let task = match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => String::new(),
        };

        format!(
            "Navigate to {url} and {lower}.\n\n\
             Instructions:\n\
             1. Go to {url}\n\
             2. {task}\n\
             3. If you encounter a modal, popup, or dialog - close it first before proceeding\n\
             4. Once the task is demonstrated (not necessarily completed end-to-end), stop",
            url = parsed.url,
            lower = lower,
            task = task
        )
    }

    /// Run the loop to completion or until the turn budget runs out
    pub async fn run(&self, parsed: &ParsedQuery, hook: &mut dyn StepHook) -> Result<RunSummary> {
        let task = Self::task_prompt(parsed);
        let mut state = AgentLoopState::new(self.max_turns);

        println!(
            "\n[Navigator] Starting reasoning loop (max {} turns)",
            state.max_turns
        );

        while state.should_continue() {
            let turn = state.turn + 1;
            println!("\n[Turn {}/{}] Analyzing...", turn, state.max_turns);

            let response = self.call_navigator(&task, &state).await?;

            if response.tool_calls.is_empty() {
                let answer = response.content.trim();
                state.final_answer = Some(if answer.is_empty() {
                    "Task demonstrated.".to_string()
                } else {
                    answer.to_string()
                });
                if self.debug {
                    eprintln!("DEBUG: Final answer received on turn {}", turn);
                }
                break;
            }

            println!(
                "[Turn {}] Executing {} tool(s)...",
                turn,
                response.tool_calls.len()
            );

            self.execute_turn(&response, &mut state, hook).await?;
            state.next_turn();
        }

        let completed = state.final_answer.is_some();
        if !completed {
            println!("\n[Navigator] Max turns reached.");
        }

        let done = AgentStep {
            step_index: state.next_step(),
            action: DONE_ACTION.to_string(),
            summary: state
                .final_answer
                .clone()
                .unwrap_or_else(|| format!("Stopped after {} turns", state.turn)),
        };
        hook.on_step(&done).await;

        println!(
            "\n[Navigator] Complete ({} turns, {} observations)",
            state.turn,
            state.observations.len()
        );

        Ok(RunSummary {
            turns: state.turn,
            steps: state.steps,
            final_answer: state.final_answer,
            completed,
        })
    }

    /// Execute the turn's tool calls in order, reporting page actions
    async fn execute_turn(
        &self,
        response: &LLMResponse,
        state: &mut AgentLoopState,
        hook: &mut dyn StepHook,
    ) -> Result<()> {
        for call in &response.tool_calls {
            let action = self.tools.describe(call);
            if self.debug {
                eprintln!("DEBUG: Executing {} {}", call.name, call.arguments);
            }

            let observation = match self.tools.execute(call).await {
                Ok(result) => Observation::from_result(result, &action),
                Err(GuideError::AgentBrowserNotFound) => return Err(GuideError::AgentBrowserNotFound),
                Err(e) => Observation::error(&call.name, &action, e.to_string()),
            };

            let status = if observation.success { "✓" } else { "✗" };
            println!("  {} {}", status, action);

            let report = observation.success && is_page_action(&call.name);
            state.add_observations(vec![observation]);

            if report {
                let step = AgentStep {
                    step_index: state.next_step(),
                    action,
                    summary: response.content.trim().to_string(),
                };
                hook.on_step(&step).await;
            }
        }
        Ok(())
    }

    async fn call_navigator(&self, task: &str, state: &AgentLoopState) -> Result<LLMResponse> {
        let user_content = if state.observations.is_empty() {
            task.to_string()
        } else {
            format!("{}\n{}", task, state.format_observations())
        };

        let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(user_content)];
        let tool_defs = self.tools.definitions();

        if self.debug {
            eprintln!("DEBUG: Calling navigator with {} tools", tool_defs.len());
        }

        self.llm
            .chat_with_tools(
                &self.model,
                &messages,
                &tool_defs,
                Some(GenerateOptions {
                    temperature: Some(0.1), // Low temperature for tool selection
                    ..Default::default()
                }),
            )
            .await
    }
}
