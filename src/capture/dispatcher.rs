//! Per-step capture hook
//!
//! The navigator awaits `StepDispatcher::on_step` after every browser action.
//! Each call runs the same pipeline: warm-up gate, stability wait, overlay
//! scrub, login gate, login-URL skip, readiness check, then screenshot and
//! significance filter. Anything that touches the live page may fail; a
//! failure only skips the current capture.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::agent::navigator::{AgentStep, StepHook};
use crate::capture::login::{is_login_page, url_looks_like_login, LoginWaitOutcome, LoginWaiter};
use crate::capture::page::{BrowserHandle, Page};
use crate::capture::readiness::{self, Shortfall};
use crate::capture::significance::{PerceptualHash, StateChangeFilter};
use crate::core::{CaptureConfig, ProgressEvent, ProgressSink};
use crate::dataset::{CapturedState, DatasetWriter};

/// Login bookkeeping for one run. Once detected it stays detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoginState {
    pub detected: bool,
    pub waited_seconds: u64,
}

/// Mutable state of one capture run
#[derive(Debug)]
pub struct RunSession {
    started_at: Instant,
    filter: StateChangeFilter,
    login: LoginState,
    observed: usize,
    states: Vec<CapturedState>,
}

impl RunSession {
    pub fn new(hash_threshold: u32) -> Self {
        Self {
            started_at: Instant::now(),
            filter: StateChangeFilter::new(hash_threshold),
            login: LoginState::default(),
            observed: 0,
            states: Vec::new(),
        }
    }

    pub fn login(&self) -> LoginState {
        self.login
    }

    /// Hook invocations seen, captured or not
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Persisted states in capture order
    pub fn states(&self) -> &[CapturedState] {
        &self.states
    }

    pub fn into_states(self) -> Vec<CapturedState> {
        self.states
    }
}

/// What happened to one step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Too soon after the run started
    WarmingUp,
    /// No page to look at
    PageUnavailable,
    /// A login page was found and the run paused for the human
    LoginHandled(LoginWaitOutcome),
    /// The URL still looks like an auth flow
    LoginUrlSkipped,
    /// Content has not finished loading
    NotReady(Shortfall),
    /// Too close to the last persisted frame
    Duplicate { distance: u32 },
    /// Persisted as screenshot number `index`
    Captured { index: usize, path: String },
    /// Reading the page or writing the file failed
    CaptureFailed(String),
}

/// Decides, per agent step, whether the current page becomes a dataset state
pub struct StepDispatcher {
    browser: Arc<dyn BrowserHandle>,
    writer: DatasetWriter,
    capture: CaptureConfig,
    waiter: LoginWaiter,
    requires_auth: bool,
    progress: Arc<dyn ProgressSink>,
    session: RunSession,
}

impl StepDispatcher {
    /// The warm-up window starts now
    pub fn new(
        browser: Arc<dyn BrowserHandle>,
        writer: DatasetWriter,
        capture: CaptureConfig,
        requires_auth: bool,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            browser,
            writer,
            waiter: LoginWaiter::from_config(&capture),
            session: RunSession::new(capture.hash_threshold),
            capture,
            requires_auth,
            progress,
        }
    }

    pub fn session(&self) -> &RunSession {
        &self.session
    }

    pub fn writer(&self) -> &DatasetWriter {
        &self.writer
    }

    /// End the run, handing back its state
    pub fn finish(self) -> RunSession {
        self.session
    }

    /// Run the capture pipeline for one step
    pub async fn observe(&mut self, step: &AgentStep) -> StepOutcome {
        self.session.observed += 1;

        if self.session.started_at.elapsed() < self.capture.warmup() {
            debug!(step = step.step_index, "within warm-up window, skipping");
            return StepOutcome::WarmingUp;
        }

        let browser = Arc::clone(&self.browser);
        let Some(page) = browser.page() else {
            println!("⚠ Could not access browser page for step {}", step.step_index);
            return StepOutcome::PageUnavailable;
        };

        self.stabilize(page).await;

        if self.requires_auth && !self.session.login.detected && is_login_page(page).await {
            return self.handle_login().await;
        }

        if self.requires_auth || self.session.login.detected {
            match page.url().await {
                Ok(url) if url_looks_like_login(&url) => {
                    debug!(%url, "still on an auth url, skipping");
                    return StepOutcome::LoginUrlSkipped;
                }
                Ok(_) => {}
                Err(e) => return self.failed("reading url", e),
            }
        }

        match readiness::check_page(page, &self.capture.readiness).await {
            Ok(shortfall) if shortfall.is_ready() => {}
            Ok(shortfall) => {
                debug!(step = step.step_index, %shortfall, "page not ready");
                return StepOutcome::NotReady(shortfall);
            }
            Err(e) => return self.failed("reading content metrics", e),
        }

        self.capture_frame(page, step).await
    }

    async fn stabilize(&self, page: &dyn Page) {
        if let Err(e) = page
            .wait_for_network_idle(self.capture.network_idle_timeout())
            .await
        {
            debug!(error = %e, "network idle not reached");
        }
        sleep(self.capture.settle()).await;

        match page.remove_overlays().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "removed automation overlays"),
            Err(e) => debug!(error = %e, "overlay scrub failed"),
        }
    }

    async fn handle_login(&mut self) -> StepOutcome {
        self.session.login.detected = true;
        self.progress.emit(ProgressEvent::status(
            "login",
            "Login page detected. Please log in manually in the browser window.",
        ));

        let report = self
            .waiter
            .wait(self.browser.as_ref(), self.capture.login_max_wait())
            .await;

        self.session.login.waited_seconds = report.waited.as_secs();
        // The first frame after the human returns is always a new state
        self.session.filter.reset();

        info!(outcome = ?report.outcome, waited = self.session.login.waited_seconds, "login gate finished");
        StepOutcome::LoginHandled(report.outcome)
    }

    async fn capture_frame(&mut self, page: &dyn Page, step: &AgentStep) -> StepOutcome {
        let png = match page.screenshot(self.capture.full_page).await {
            Ok(png) => png,
            Err(e) => return self.failed("taking screenshot", e),
        };
        let hash = match PerceptualHash::of_screenshot(&png) {
            Ok(hash) => hash,
            Err(e) => return self.failed("hashing screenshot", e),
        };

        if !self.session.filter.is_significant(hash) {
            let distance = self.session.filter.distance_to_last(hash).unwrap_or(0);
            debug!(step = step.step_index, distance, "no significant change");
            return StepOutcome::Duplicate { distance };
        }

        let index = self.session.states.len() + 1;
        let path = match self.writer.save_screenshot(index, &png) {
            Ok(path) => path,
            Err(e) => return self.failed("saving screenshot", e),
        };
        self.session.filter.record(hash);

        let description = match page.title().await {
            Ok(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => step.action.clone(),
        };
        self.session.states.push(CapturedState {
            step: index,
            screenshot: path.clone(),
            description,
            action_taken: step.action.clone(),
            reasoning: step.summary.clone(),
        });

        println!("📸 Captured screenshot {} ({})", index, step.action);
        self.progress.emit(ProgressEvent::Status {
            message: format!("Captured screenshot {}", index),
            stage: "capturing".to_string(),
            app_name: Some(self.writer.app_name().to_string()),
            task_name: Some(self.writer.task_name().to_string()),
        });

        StepOutcome::Captured { index, path }
    }

    fn failed(&self, what: &str, error: impl std::fmt::Display) -> StepOutcome {
        warn!(error = %error, "{} failed, skipping capture", what);
        StepOutcome::CaptureFailed(format!("{}: {}", what, error))
    }
}

#[async_trait]
impl StepHook for StepDispatcher {
    async fn on_step(&mut self, step: &AgentStep) {
        let outcome = self.observe(step).await;
        debug!(step = step.step_index, ?outcome, "step observed");
    }
}
