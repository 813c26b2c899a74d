//! Persistent map of app name to base URL
//!
//! URLs the parser learns from the model are remembered so later runs for the
//! same app start from the same place even if the model omits the URL.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::core::Result;

/// Base URLs for apps the tool is commonly pointed at
pub const DEFAULT_APP_URLS: &[(&str, &str)] = &[
    ("youtube", "https://www.youtube.com"),
    ("github", "https://github.com"),
    ("linear", "https://linear.app"),
    ("notion", "https://www.notion.so"),
    ("stackoverflow", "https://stackoverflow.com"),
    ("reddit", "https://www.reddit.com"),
];

/// Built-in URL for an app, if any
pub fn default_url(app: &str) -> Option<&'static str> {
    DEFAULT_APP_URLS
        .iter()
        .find(|(name, _)| *name == app)
        .map(|(_, url)| *url)
}

/// Last resort: `https://<app>.com`
pub fn guess_url(app: &str) -> String {
    format!("https://{}.com", app)
}

/// JSON-backed URL cache, loaded on first use
#[derive(Debug)]
pub struct UrlCache {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<String, String>>>,
}

impl UrlCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> BTreeMap<String, String> {
        let Ok(content) = fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable url cache");
                BTreeMap::new()
            }
        }
    }

    fn with_entries<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> T {
        let mut guard = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let entries = guard.get_or_insert_with(|| Self::read_file(&self.path));
        f(entries)
    }

    /// Cached URL for an app
    pub fn get(&self, app: &str) -> Option<String> {
        self.with_entries(|entries| entries.get(app).cloned())
    }

    /// Remember a URL and write the cache back to disk
    pub fn insert(&self, app: &str, url: &str) -> Result<()> {
        let snapshot = self.with_entries(|entries| {
            if entries.get(app).map(String::as_str) == Some(url) {
                None
            } else {
                entries.insert(app.to_string(), url.to_string());
                Some(entries.clone())
            }
        });

        let Some(entries) = snapshot else {
            return Ok(());
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        debug!(%app, %url, "cached app url");
        Ok(())
    }

    /// Cache, then built-in defaults, then a `.com` guess
    pub fn resolve(&self, app: &str) -> String {
        self.get(app)
            .or_else(|| default_url(app).map(str::to_string))
            .unwrap_or_else(|| guess_url(app))
    }
}
