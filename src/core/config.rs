//! Configuration management for guidegen
//!
//! Supports environment variables, config files, and runtime overrides.
//! Every capture threshold lives here so it can be tuned without a rebuild.
//!
//! Config file location: ~/.config/guidegen/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::{GuideError, Result};

/// Main configuration for guidegen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM backend configuration
    pub llm: LlmConfig,
    /// Model configuration
    pub models: ModelConfig,
    /// Browser configuration
    pub browser: BrowserConfig,
    /// Navigator agent configuration
    pub agent: AgentConfig,
    /// Screenshot capture tuning
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Dataset output configuration
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// HTTP facade configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which LLM backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Local Ollama server
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl ProviderType {
    /// Parse a provider name as accepted on the command line
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "open_ai" | "open-ai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Ollama => write!(f, "ollama"),
            ProviderType::OpenAi => write!(f, "openai"),
        }
    }
}

/// LLM backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Active provider
    pub provider: ProviderType,
    /// Ollama host address (default: localhost)
    pub ollama_host: String,
    /// Ollama port number (default: 11434)
    pub ollama_port: u16,
    /// Base URL of the OpenAI-compatible API
    pub openai_base_url: String,
    /// API key; only ever read from the environment
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used to turn the question into app/task/url
    pub parser: String,
    /// Model used for browser navigation (function calling)
    pub navigator: String,
}

/// Browser automation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Session name for agent-browser
    pub session_name: String,
    /// Whether to run in headed mode (visible browser). Manual login needs this.
    pub headed: bool,
    /// Default timeout for browser operations in ms
    pub timeout_ms: u64,
}

/// Navigator behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum reasoning loop turns before stopping
    /// Default: 15
    pub max_turns: usize,
    /// Whether to show debug output
    pub debug: bool,
}

/// Screenshot capture tuning surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Steps arriving this soon after the run starts are dropped
    pub warmup_ms: u64,
    /// Upper bound on waiting for network idle before a capture
    pub network_idle_timeout_ms: u64,
    /// Fixed settle delay after the idle wait
    pub settle_ms: u64,
    /// Hash distance a frame must exceed to count as a new UI state
    pub hash_threshold: u32,
    /// Whether screenshots cover the full scrollable page
    pub full_page: bool,
    /// Budget for a human to finish logging in
    pub login_max_wait_secs: u64,
    /// How often the login waiter re-checks the page
    pub login_poll_interval_ms: u64,
    /// How often the login waiter prints a heartbeat
    pub login_heartbeat_secs: u64,
    /// Pause after login is confirmed so post-login content can render
    pub login_grace_ms: u64,
    /// Minimum content counts before a page is considered loaded
    #[serde(default)]
    pub readiness: ReadinessThresholds,
}

/// Content-readiness thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessThresholds {
    /// Loaded images plus video elements
    pub min_media: usize,
    /// Anchor elements
    pub min_links: usize,
    /// Button-like elements
    pub min_buttons: usize,
    /// Characters of visible body text
    pub min_text_chars: usize,
}

/// Dataset output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory of the dataset
    pub root: PathBuf,
    /// File name of the app URL cache, relative to the root
    pub url_cache_file: String,
}

/// HTTP facade configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Origins allowed by CORS; empty means any
    pub allowed_origins: Vec<String>,
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: env::var("GUIDEGEN_PROVIDER")
                .ok()
                .and_then(|p| ProviderType::parse(&p))
                .unwrap_or(ProviderType::Ollama),
            ollama_host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            ollama_port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            timeout_secs: 120,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            parser: env::var("GUIDEGEN_PARSER_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            navigator: env::var("GUIDEGEN_NAVIGATOR_MODEL")
                .unwrap_or_else(|_| "qwen3:8b".to_string()),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            session_name: env::var("GUIDEGEN_BROWSER_SESSION")
                .unwrap_or_else(|_| "guidegen".to_string()),
            headed: env_flag("GUIDEGEN_BROWSER_HEADED", true),
            timeout_ms: 30000,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 15,
            debug: env_flag("GUIDEGEN_DEBUG", false),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            warmup_ms: 5000,
            network_idle_timeout_ms: 3000,
            settle_ms: 1500,
            hash_threshold: 7,
            full_page: true,
            login_max_wait_secs: 300,
            login_poll_interval_ms: 3000,
            login_heartbeat_secs: 15,
            login_grace_ms: 2000,
            readiness: ReadinessThresholds::default(),
        }
    }
}

impl Default for ReadinessThresholds {
    fn default() -> Self {
        Self {
            min_media: 1,
            min_links: 5,
            min_buttons: 2,
            min_text_chars: 100,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            root: env::var("GUIDEGEN_DATASET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("dataset")),
            url_cache_file: "app_urls.json".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: env::var("GUIDEGEN_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

impl CaptureConfig {
    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn login_max_wait(&self) -> Duration {
        Duration::from_secs(self.login_max_wait_secs)
    }

    pub fn login_poll_interval(&self) -> Duration {
        Duration::from_millis(self.login_poll_interval_ms)
    }

    pub fn login_heartbeat(&self) -> Duration {
        Duration::from_secs(self.login_heartbeat_secs)
    }

    pub fn login_grace(&self) -> Duration {
        Duration::from_millis(self.login_grace_ms)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("guidegen")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_file() {
            Ok(mut config) => {
                // Secrets never live in the file
                if config.llm.openai_api_key.is_none() {
                    config.llm.openai_api_key =
                        env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
                }
                config
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from file only
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::config_file();

        if !config_path.exists() {
            return Err(GuideError::config("Config file not found"));
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| GuideError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GuideError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file and return the path
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| GuideError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GuideError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| GuideError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }

    /// Check if a config file exists
    pub fn config_exists() -> bool {
        Self::config_file().exists()
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.llm.ollama_host, self.llm.ollama_port)
    }

    /// Whether the active provider has the credentials it needs
    pub fn llm_key_configured(&self) -> bool {
        match self.llm.provider {
            ProviderType::Ollama => true,
            ProviderType::OpenAi => self.llm.openai_api_key.is_some(),
        }
    }

    /// Path of the app URL cache file
    pub fn url_cache_path(&self) -> PathBuf {
        self.dataset.root.join(&self.dataset.url_cache_file)
    }

    /// Server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
