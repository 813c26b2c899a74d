//! Core module - shared infrastructure for guidegen
//!
//! This module contains foundational types, configuration, error handling,
//! progress events and logging setup used throughout the application.

pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod types;

pub use config::{CaptureConfig, Config, ProviderType, ReadinessThresholds};
pub use error::{GuideError, Result};
pub use progress::{LogProgress, NoProgress, ProgressEvent, ProgressSink};
pub use types::*;
