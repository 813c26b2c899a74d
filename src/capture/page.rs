//! Live-page abstraction the capture logic observes
//!
//! The navigator drives the browser; everything in `capture` only reads from
//! it through these traits, so tests can substitute a scripted page.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::Result;

/// An element query the login detector can ask about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementProbe {
    /// Plain CSS selector
    Css(&'static str),
    /// A visible `<button>` whose text contains the given phrase
    ButtonText(&'static str),
}

/// Counts used to decide whether a page has finished loading its content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// Completed `<img>` elements plus `<video>` elements
    pub media: usize,
    pub links: usize,
    pub buttons: usize,
    /// Length of `document.body.innerText`
    pub text_chars: usize,
}

/// Read access to the page the agent is currently on
#[async_trait]
pub trait Page: Send + Sync {
    /// Current URL
    async fn url(&self) -> Result<String>;

    /// Document title
    async fn title(&self) -> Result<String>;

    /// Whether any element matches the probe
    async fn has_element(&self, probe: &ElementProbe) -> Result<bool>;

    /// Wait until the network goes idle or the timeout passes
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()>;

    /// Strip automation overlays (highlight boxes, injected labels) from the DOM.
    /// Returns how many elements were removed.
    async fn remove_overlays(&self) -> Result<usize>;

    /// Count loaded media, links, buttons and visible text
    async fn content_metrics(&self) -> Result<ContentMetrics>;

    /// PNG screenshot held in memory
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>>;
}

/// Something that may or may not currently have a page open
pub trait BrowserHandle: Send + Sync {
    /// The active page, or `None` when it cannot be reached
    fn page(&self) -> Option<&dyn Page>;
}
