//! Agent module - question parsing, navigation and the guide pipeline
//!
//! Contains the logic that turns a question into browser actions and hands
//! each action to the capture hook.

pub mod guide;
pub mod loop_state;
pub mod navigator;
pub mod task_parser;

pub use guide::{GuideGenerator, GuideOutcome};
pub use loop_state::{AgentLoopState, Observation};
pub use navigator::{AgentStep, Navigator, NoopHook, RunSummary, StepHook, DONE_ACTION};
pub use task_parser::TaskParser;
