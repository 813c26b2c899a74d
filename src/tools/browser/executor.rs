//! Browser executor - wraps agent-browser CLI
//!
//! Provides the async interface the navigator acts through, and the read-only
//! `Page` view the capture pipeline observes through.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::capture::page::{BrowserHandle, ContentMetrics, ElementProbe, Page};
use crate::core::config::BrowserConfig;
use crate::core::{GuideError, Result, ToolResult};
use crate::tools::browser::snapshot::Snapshot;

/// Hides anything the automation layer painted over the page: ref labels,
/// highlight boxes and full-viewport layers stacked above the app.
const REMOVE_OVERLAYS_JS: &str = r#"(() => {
  let removed = 0;
  document.querySelectorAll('[data-agent-browser], [id^="agent-browser"], [class*="agent-browser"], [data-highlight], .highlight-box').forEach(el => {
    el.remove();
    removed++;
  });
  document.querySelectorAll('body *').forEach(el => {
    const style = getComputedStyle(el);
    const z = parseInt(style.zIndex, 10);
    if (z >= 2147483000 && style.pointerEvents === 'none') {
      el.remove();
      removed++;
    }
  });
  return removed;
})()"#;

const CONTENT_METRICS_JS: &str = r#"(() => JSON.stringify({
  media: Array.from(document.images).filter(img => img.complete && img.naturalWidth > 0).length
    + document.querySelectorAll('video').length,
  links: document.querySelectorAll('a[href]').length,
  buttons: document.querySelectorAll('button, [role="button"], input[type="submit"]').length,
  text_chars: (document.body && document.body.innerText || '').trim().length
}))()"#;

/// Executor for browser automation via agent-browser CLI
pub struct BrowserExecutor {
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    /// Upper bound on a single CLI invocation
    timeout: Duration,
    /// Set once a page has been opened, cleared on close
    opened: AtomicBool,
    /// Last parsed snapshot, used to name elements in action descriptions
    last_snapshot: Mutex<Option<Snapshot>>,
    scratch_dir: PathBuf,
    scratch_counter: AtomicU64,
}

impl BrowserExecutor {
    /// Create a new browser executor
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            headed: false,
            timeout: Duration::from_secs(30),
            opened: AtomicBool::new(false),
            last_snapshot: Mutex::new(None),
            scratch_dir: std::env::temp_dir().join("guidegen"),
            scratch_counter: AtomicU64::new(0),
        }
    }

    /// Create an executor from browser configuration
    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut executor = Self::new(config.session_name.clone());
        executor.headed = config.headed;
        executor.timeout = Duration::from_millis(config.timeout_ms);
        executor
    }

    /// Set headed mode
    pub fn set_headed(&mut self, headed: bool) {
        self.headed = headed;
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Whether a page is currently open
    pub fn is_open(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Check if agent-browser is installed
    pub async fn is_available() -> bool {
        Command::new("agent-browser")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Agent-browser refs are `@eN`; models often drop the `@`
    fn normalize_ref(ref_id: &str) -> String {
        let trimmed = ref_id.trim();
        if trimmed.starts_with('@') {
            trimmed.to_string()
        } else {
            format!("@{}", trimmed)
        }
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("agent-browser");
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        debug!(?args, "agent-browser");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                GuideError::browser(format!(
                    "agent-browser {} timed out after {}ms",
                    args.first().copied().unwrap_or_default(),
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GuideError::AgentBrowserNotFound
                } else {
                    GuideError::browser(format!("Failed to run agent-browser: {}", e))
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(GuideError::browser(format!(
                "agent-browser command failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Run a command and return JSON output
    async fn run_json_command(&self, args: &[&str]) -> Result<String> {
        let mut full_args: Vec<&str> = args.to_vec();
        full_args.push("--json");
        self.run_command(&full_args).await
    }

    /// Take an interactive snapshot and remember it
    async fn refresh_snapshot(&self) -> Result<String> {
        let output = self.run_json_command(&["snapshot", "-i"]).await?;
        let parsed = serde_json::from_str::<Snapshot>(&output).ok();
        *self.last_snapshot.lock().unwrap_or_else(|p| p.into_inner()) = parsed.clone();

        Ok(match parsed {
            Some(snapshot) => snapshot.format_for_display(),
            None => output,
        })
    }

    /// `role "name"` for a ref in the last snapshot
    pub fn describe_ref(&self, ref_id: &str) -> Option<String> {
        let guard = self.last_snapshot.lock().unwrap_or_else(|p| p.into_inner());
        guard
            .as_ref()
            .and_then(|s| s.get_element(ref_id))
            .map(|el| el.label())
    }

    /// Navigate to a URL
    pub async fn open(&self, url: &str, wait_for_load: bool) -> Result<ToolResult> {
        self.run_command(&["open", url]).await?;
        self.opened.store(true, Ordering::SeqCst);

        if wait_for_load {
            if let Err(e) = self.run_command(&["wait", "--load", "networkidle"]).await {
                debug!(error = %e, "network idle wait after open failed");
            }
        }

        let snapshot = self.refresh_snapshot().await?;
        Ok(ToolResult::success(
            "browser_url",
            format!("Navigated to {}. Page snapshot:\n{}", url, snapshot),
        ))
    }

    /// Click an element by ref
    pub async fn click(&self, ref_id: &str) -> Result<ToolResult> {
        let target = Self::normalize_ref(ref_id);
        self.run_command(&["click", &target]).await?;

        let snapshot = self.refresh_snapshot().await?;
        Ok(ToolResult::success(
            "browser_click",
            format!("Clicked {}. Updated page:\n{}", target, snapshot),
        ))
    }

    /// Fill an input field
    pub async fn fill(&self, ref_id: &str, text: &str) -> Result<ToolResult> {
        let target = Self::normalize_ref(ref_id);
        self.run_command(&["fill", &target, text]).await?;

        Ok(ToolResult::success(
            "browser_fill",
            format!("Filled {} with '{}'", target, text),
        ))
    }

    /// Get text from an element
    pub async fn get_text(&self, ref_id: &str) -> Result<ToolResult> {
        let target = Self::normalize_ref(ref_id);
        let output = self.run_command(&["get", "text", &target]).await?;

        Ok(ToolResult::success("browser_get_text", output.trim()))
    }

    /// Get page snapshot
    pub async fn snapshot(&self) -> Result<ToolResult> {
        let snapshot = self.refresh_snapshot().await?;
        Ok(ToolResult::success("browser_snapshot", snapshot))
    }

    /// Write a screenshot to a scratch file and read it back
    pub async fn screenshot_bytes(&self, full_page: bool) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let n = self.scratch_counter.fetch_add(1, Ordering::SeqCst);
        let path = self
            .scratch_dir
            .join(format!("{}-{}-{}.png", self.session_name, std::process::id(), n));
        let path_str = path.to_string_lossy().into_owned();

        let mut args = vec!["screenshot", path_str.as_str()];
        if full_page {
            args.push("--full");
        }
        self.run_command(&args).await?;

        let bytes = tokio::fs::read(&path).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            debug!(path = %path.display(), error = %e, "could not remove scratch screenshot");
        }
        Ok(bytes?)
    }

    /// Close the browser
    pub async fn close(&self) -> Result<ToolResult> {
        self.opened.store(false, Ordering::SeqCst);
        self.run_command(&["close"]).await?;
        Ok(ToolResult::success("browser_close", "Browser closed"))
    }

    /// Press a key
    pub async fn press(&self, key: &str) -> Result<ToolResult> {
        self.run_command(&["press", key]).await?;
        let snapshot = self.refresh_snapshot().await?;
        Ok(ToolResult::success(
            "browser_press",
            format!("Pressed {}. Updated page:\n{}", key, snapshot),
        ))
    }

    /// Scroll the page
    pub async fn scroll(&self, direction: &str, pixels: Option<u64>) -> Result<ToolResult> {
        let mut args = vec!["scroll", direction];
        let px_str;

        if let Some(px) = pixels {
            px_str = px.to_string();
            args.push(&px_str);
        }

        self.run_command(&args).await?;
        Ok(ToolResult::success(
            "browser_scroll",
            format!("Scrolled {}", direction),
        ))
    }

    /// Get current URL
    pub async fn get_url(&self) -> Result<String> {
        self.run_command(&["get", "url"])
            .await
            .map(|s| s.trim().to_string())
    }

    /// Get page title
    pub async fn get_title(&self) -> Result<String> {
        self.run_command(&["get", "title"])
            .await
            .map(|s| s.trim().to_string())
    }

    /// Wait for the page to finish loading
    pub async fn wait_for_load(&self) -> Result<ToolResult> {
        self.run_command(&["wait", "--load", "networkidle"]).await?;
        Ok(ToolResult::success("browser_wait", "Page finished loading"))
    }

    /// Wait for text to appear
    pub async fn wait_for_text(&self, text: &str) -> Result<ToolResult> {
        self.run_command(&["wait", "--text", text]).await?;
        Ok(ToolResult::success(
            "browser_wait",
            format!("Text '{}' is now visible", text),
        ))
    }

    /// Evaluate JavaScript and return the raw CLI output
    pub async fn eval(&self, script: &str) -> Result<String> {
        self.run_command(&["eval", script])
            .await
            .map(|s| s.trim().to_string())
    }

    /// Evaluate JavaScript whose result is JSON
    pub async fn eval_json<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let output = self.eval(script).await?;
        decode_eval_output(&output)
    }
}

/// The CLI prints strings JSON-quoted, so a script returning
/// `JSON.stringify(..)` can come back encoded twice.
fn decode_eval_output<T: DeserializeOwned>(output: &str) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(output.trim())
        .map_err(|e| GuideError::browser(format!("eval returned non-JSON output: {}", e)))?;

    match value {
        serde_json::Value::String(inner) => match serde_json::from_str(&inner) {
            Ok(decoded) => Ok(decoded),
            Err(_) => Ok(serde_json::from_value(serde_json::Value::String(inner))?),
        },
        other => Ok(serde_json::from_value(other)?),
    }
}

/// JS expression answering one login probe
fn probe_script(probe: &ElementProbe) -> String {
    match probe {
        ElementProbe::Css(selector) => format!(
            "document.querySelector({}) !== null",
            serde_json::Value::String(selector.to_string())
        ),
        ElementProbe::ButtonText(text) => format!(
            "Array.from(document.querySelectorAll('button')).some(b => b.offsetParent !== null && (b.innerText || '').toLowerCase().includes({}))",
            serde_json::Value::String(text.to_lowercase())
        ),
    }
}

#[async_trait]
impl Page for BrowserExecutor {
    async fn url(&self) -> Result<String> {
        self.get_url().await
    }

    async fn title(&self) -> Result<String> {
        self.get_title().await
    }

    async fn has_element(&self, probe: &ElementProbe) -> Result<bool> {
        self.eval_json(&probe_script(probe)).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<()> {
        match tokio::time::timeout(timeout, self.wait_for_load()).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => Err(GuideError::browser("network idle wait timed out")),
        }
    }

    async fn remove_overlays(&self) -> Result<usize> {
        self.eval_json(REMOVE_OVERLAYS_JS).await
    }

    async fn content_metrics(&self) -> Result<ContentMetrics> {
        self.eval_json(CONTENT_METRICS_JS).await
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>> {
        self.screenshot_bytes(full_page).await
    }
}

impl BrowserHandle for BrowserExecutor {
    fn page(&self) -> Option<&dyn Page> {
        if self.is_open() {
            Some(self)
        } else {
            warn!(session = %self.session_name, "no page open in browser session");
            None
        }
    }
}

impl Default for BrowserExecutor {
    fn default() -> Self {
        Self::new("guidegen")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executor_from_config() {
        let config = BrowserConfig {
            session_name: "test-session".to_string(),
            headed: true,
            timeout_ms: 5_000,
        };
        let executor = BrowserExecutor::from_config(&config);
        assert_eq!(executor.session_name(), "test-session");
        assert!(executor.headed);
        assert_eq!(executor.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_page_unavailable_until_opened() {
        let executor = BrowserExecutor::new("unopened");
        assert!(!executor.is_open());
        assert!(executor.page().is_none());

        executor.opened.store(true, Ordering::SeqCst);
        assert!(executor.page().is_some());
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(BrowserExecutor::normalize_ref("e5"), "@e5");
        assert_eq!(BrowserExecutor::normalize_ref(" @e12 "), "@e12");
    }

    #[test]
    fn test_decode_eval_output_variants() {
        let plain: ContentMetrics =
            decode_eval_output(r#"{"media":2,"links":9,"buttons":3,"text_chars":400}"#).unwrap();
        assert_eq!(plain.links, 9);

        let doubled: ContentMetrics = decode_eval_output(
            r#""{\"media\":1,\"links\":5,\"buttons\":2,\"text_chars\":100}""#,
        )
        .unwrap();
        assert_eq!(doubled.text_chars, 100);

        let flag: bool = decode_eval_output("true\n").unwrap();
        assert!(flag);
        let count: usize = decode_eval_output("3").unwrap();
        assert_eq!(count, 3);

        assert!(decode_eval_output::<bool>("undefined").is_err());
    }

    #[test]
    fn test_probe_scripts_quote_selectors() {
        let css = probe_script(&ElementProbe::Css(r#"input[type="password"]"#));
        assert_eq!(
            css,
            r#"document.querySelector("input[type=\"password\"]") !== null"#
        );

        let button = probe_script(&ElementProbe::ButtonText("Log in"));
        assert!(button.contains(r#"includes("log in")"#));
    }
}
