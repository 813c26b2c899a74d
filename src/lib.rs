//! guidegen - UI guide generator
//!
//! Drives an LLM-controlled browser through a task in a web application,
//! captures the screens that matter and writes them up as a step-by-step
//! guide.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, progress events and error handling
//! - **LLM**: Provider abstraction with Ollama and OpenAI-compatible clients
//! - **Tools**: agent-browser executor and the navigator's tool registry
//! - **Capture**: Login gating, readiness checks and screenshot significance
//! - **Agent**: Task parser, navigator loop and the guide pipeline
//! - **Dataset**: Metadata, workflow docs and the dataset index
//! - **Server**: HTTP/WebSocket facade
//! - **CLI**: Subcommand handlers
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use guidegen::{Config, GuideGenerator, LogProgress};
//!
//! #[tokio::main]
//! async fn main() {
//!     let generator = GuideGenerator::new(Config::load()).unwrap();
//!     let outcome = generator
//!         .generate("How to search for videos on YouTube?", Arc::new(LogProgress))
//!         .await
//!         .unwrap();
//!     println!("{}", outcome.workflow_file.display());
//! }
//! ```

pub mod agent;
pub mod capture;
pub mod cli;
pub mod core;
pub mod dataset;
pub mod llm;
pub mod server;
pub mod tools;

// Re-export commonly used items
pub use agent::{GuideGenerator, GuideOutcome};
pub use core::{Config, GuideError, LogProgress, ProgressEvent, ProgressSink, ProviderType, Result};
