//! Tools module - browser tools for the navigator
//!
//! Contains the agent-browser executor and the registry that exposes it to
//! the model.

pub mod browser;
pub mod registry;

pub use registry::{describe_action, is_page_action, ToolExecutor, ToolRegistry};
