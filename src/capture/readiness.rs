//! Content-readiness heuristic
//!
//! A page that has gone network-idle can still be a skeleton. Before a frame
//! is considered for capture it must show some media, links, buttons and text.

use crate::capture::page::{ContentMetrics, Page};
use crate::core::{ReadinessThresholds, Result};

/// Which thresholds a page fell short of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shortfall {
    pub missing: Vec<&'static str>,
}

impl Shortfall {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.missing.is_empty() {
            write!(f, "ready")
        } else {
            write!(f, "waiting on {}", self.missing.join(", "))
        }
    }
}

/// Compare metrics against every threshold
pub fn evaluate(metrics: &ContentMetrics, thresholds: &ReadinessThresholds) -> Shortfall {
    let checks = [
        ("media", metrics.media, thresholds.min_media),
        ("links", metrics.links, thresholds.min_links),
        ("buttons", metrics.buttons, thresholds.min_buttons),
        ("text", metrics.text_chars, thresholds.min_text_chars),
    ];

    Shortfall {
        missing: checks
            .into_iter()
            .filter(|(_, have, need)| have < need)
            .map(|(name, _, _)| name)
            .collect(),
    }
}

/// Read metrics from the live page and evaluate them
pub async fn check_page(page: &dyn Page, thresholds: &ReadinessThresholds) -> Result<Shortfall> {
    let metrics = page.content_metrics().await?;
    Ok(evaluate(&metrics, thresholds))
}
