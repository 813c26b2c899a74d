//! Login page detection and the manual-login wait
//!
//! Detection is a cheap heuristic: URL keywords, then title keywords, then a
//! fixed list of element probes. It never fails; any error reads as "not a
//! login page" so a flaky page cannot stall the run.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::capture::page::{BrowserHandle, ElementProbe, Page};
use crate::core::{CaptureConfig, Result};

/// URL fragments that mark an auth flow
pub const LOGIN_URL_KEYWORDS: &[&str] = &["login", "signin", "sign-in", "auth", "authenticate", "sso"];

/// Title fragments that mark an auth flow
pub const LOGIN_TITLE_KEYWORDS: &[&str] = &["log in", "sign in", "login", "signin", "authenticate"];

/// Elements that only show up on login forms
pub const LOGIN_PROBES: &[ElementProbe] = &[
    ElementProbe::Css(r#"input[type="password"]"#),
    ElementProbe::Css(r#"input[name*="password"]"#),
    ElementProbe::Css(r#"input[name*="email"]"#),
    ElementProbe::Css(r#"input[placeholder*="password" i]"#),
    ElementProbe::Css(r#"input[placeholder*="email" i]"#),
    ElementProbe::ButtonText("Log in"),
    ElementProbe::ButtonText("Sign in"),
];

/// Whether a URL contains any login keyword
pub fn url_looks_like_login(url: &str) -> bool {
    let url = url.to_lowercase();
    LOGIN_URL_KEYWORDS.iter().any(|k| url.contains(k))
}

/// Whether a title contains any login keyword
pub fn title_looks_like_login(title: &str) -> bool {
    let title = title.to_lowercase();
    LOGIN_TITLE_KEYWORDS.iter().any(|k| title.contains(k))
}

/// Classify the page. Fail-open: errors return `false`.
pub async fn is_login_page(page: &dyn Page) -> bool {
    match detect(page).await {
        Ok(found) => found,
        Err(e) => {
            debug!(error = %e, "login detection failed, assuming not a login page");
            false
        }
    }
}

async fn detect(page: &dyn Page) -> Result<bool> {
    let url = page.url().await?;
    if url_looks_like_login(&url) {
        debug!(%url, "login keyword in url");
        return Ok(true);
    }

    let title = page.title().await?;
    if title_looks_like_login(&title) {
        debug!(%title, "login keyword in title");
        return Ok(true);
    }

    for probe in LOGIN_PROBES {
        match page.has_element(probe).await {
            Ok(true) => {
                debug!(?probe, "login element present");
                return Ok(true);
            }
            Ok(false) => {}
            // One broken selector should not hide the others
            Err(e) => debug!(?probe, error = %e, "login probe failed"),
        }
    }

    Ok(false)
}

/// How a manual-login wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginWaitOutcome {
    /// The page stopped looking like a login page
    Confirmed,
    /// The budget ran out
    TimedOut,
    /// The page handle could not be obtained
    Unreachable,
}

impl LoginWaitOutcome {
    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}

/// Outcome plus how long the human was waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginWaitReport {
    pub outcome: LoginWaitOutcome,
    pub waited: Duration,
}

/// Blocking poll loop that suspends automation while a human logs in
#[derive(Debug, Clone)]
pub struct LoginWaiter {
    poll_interval: Duration,
    heartbeat: Duration,
    grace: Duration,
}

impl Default for LoginWaiter {
    fn default() -> Self {
        Self::from_config(&CaptureConfig::default())
    }
}

impl LoginWaiter {
    pub fn from_config(capture: &CaptureConfig) -> Self {
        Self {
            poll_interval: capture.login_poll_interval(),
            heartbeat: capture.login_heartbeat(),
            grace: capture.login_grace(),
        }
    }

    /// Poll until the login page goes away, the budget runs out, or the page
    /// becomes unreachable. Never returns an error.
    pub async fn wait(&self, handle: &dyn BrowserHandle, max_wait: Duration) -> LoginWaitReport {
        let start = Instant::now();
        let report = |outcome| LoginWaitReport {
            outcome,
            waited: start.elapsed(),
        };

        let Some(page) = handle.page() else {
            warn!("could not access browser page for login wait");
            println!("⚠ Could not access browser page");
            return report(LoginWaitOutcome::Unreachable);
        };

        let initial_url = match page.url().await {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not read page url for login wait");
                return report(LoginWaitOutcome::Unreachable);
            }
        };

        println!("\n{}", "=".repeat(70));
        println!("🔐 LOGIN REQUIRED");
        println!("{}", "=".repeat(70));
        println!("\n👤 Please log in manually in the browser window");
        println!("   The system will automatically detect when you're logged in");
        println!("   (waiting up to {} seconds)\n", max_wait.as_secs());

        let mut last_heartbeat = start;

        while start.elapsed() < max_wait {
            sleep(self.poll_interval).await;

            let current_url = match page.url().await {
                Ok(url) => url,
                Err(e) => {
                    warn!(error = %e, "page became unreachable during login wait");
                    return report(LoginWaitOutcome::Unreachable);
                }
            };
            let still_login = is_login_page(page).await;

            if last_heartbeat.elapsed() >= self.heartbeat {
                println!("   ⏳ Still waiting... ({}s elapsed)", start.elapsed().as_secs());
                last_heartbeat = Instant::now();
            }

            if !still_login {
                if current_url != initial_url {
                    println!("\n✓ Login detected! Continuing with navigation...\n");
                } else {
                    // Single-page apps swap the form out without navigating
                    println!("\n✓ Login page changed! Continuing with navigation...\n");
                }
                info!(%current_url, "manual login confirmed");
                sleep(self.grace).await;
                return report(LoginWaitOutcome::Confirmed);
            }
        }

        println!("\n⏱ Timeout after {}s. Continuing anyway...", max_wait.as_secs());
        report(LoginWaitOutcome::TimedOut)
    }
}

/// Wait with default poll timings. `true` means login completed.
pub async fn wait_for_login(handle: &dyn BrowserHandle, max_wait: Duration) -> bool {
    LoginWaiter::default()
        .wait(handle, max_wait)
        .await
        .outcome
        .is_confirmed()
}
