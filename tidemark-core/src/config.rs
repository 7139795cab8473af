//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/tidemark/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/tidemark/` (~/.config/tidemark/)
//! - Data: `$XDG_DATA_HOME/tidemark/` (~/.local/share/tidemark/)
//! - State/Logs: `$XDG_STATE_HOME/tidemark/` (~/.local/state/tidemark/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Classification thresholds
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Offline capture queue tuning
    #[serde(default)]
    pub queue: QueueConfig,

    /// Capture delivery endpoint (optional)
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds for the classification pipeline.
///
/// The marker gate threshold (10 s) is deliberately separate from the
/// heuristic glance/read/study thresholds; the two sets were never
/// reconciled in the original behavior and both stay configurable.
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Below this dwell time a page is discarded outright (ms)
    #[serde(default = "default_glance_threshold_ms")]
    pub glance_threshold_ms: u64,

    /// Dwell time separating ambient from engaged (ms)
    #[serde(default = "default_read_threshold_ms")]
    pub read_threshold_ms: u64,

    /// Dwell time separating engaged from committed (ms)
    #[serde(default = "default_study_threshold_ms")]
    pub study_threshold_ms: u64,

    /// Visits shorter than this with no marker match are discarded (ms)
    #[serde(default = "default_marker_gate_ms")]
    pub marker_gate_ms: u64,

    /// Word count under which the short-content lower bar applies
    #[serde(default = "default_short_content_words")]
    pub short_content_words: u32,

    /// Minimum page text length for relevance matching (chars)
    #[serde(default = "default_min_match_text_chars")]
    pub min_match_text_chars: usize,

    /// Raw similarity above which a centroid counts as a match
    #[serde(default = "default_relevance_pass_threshold")]
    pub relevance_pass_threshold: f64,

    /// Timeout for an externally-supplied semantics check (ms)
    #[serde(default = "default_semantics_timeout_ms")]
    pub semantics_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            glance_threshold_ms: default_glance_threshold_ms(),
            read_threshold_ms: default_read_threshold_ms(),
            study_threshold_ms: default_study_threshold_ms(),
            marker_gate_ms: default_marker_gate_ms(),
            short_content_words: default_short_content_words(),
            min_match_text_chars: default_min_match_text_chars(),
            relevance_pass_threshold: default_relevance_pass_threshold(),
            semantics_timeout_ms: default_semantics_timeout_ms(),
        }
    }
}

fn default_glance_threshold_ms() -> u64 {
    5_000
}

fn default_read_threshold_ms() -> u64 {
    30_000
}

fn default_study_threshold_ms() -> u64 {
    120_000
}

fn default_marker_gate_ms() -> u64 {
    10_000
}

fn default_short_content_words() -> u32 {
    120
}

fn default_min_match_text_chars() -> usize {
    200
}

fn default_relevance_pass_threshold() -> f64 {
    0.55
}

fn default_semantics_timeout_ms() -> u64 {
    5_000
}

/// Offline capture queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Initial retry backoff (ms)
    #[serde(default = "default_backoff_min_ms")]
    pub backoff_min_ms: u64,

    /// Backoff multiplier per retry
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,

    /// Backoff ceiling (ms)
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Retries before an item is marked permanently failed
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Max items pulled per process_queue pass
    #[serde(default = "default_queue_batch_limit")]
    pub batch_limit: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff_min_ms: default_backoff_min_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            backoff_max_ms: default_backoff_max_ms(),
            max_retries: default_max_retries(),
            batch_limit: default_queue_batch_limit(),
        }
    }
}

fn default_backoff_min_ms() -> u64 {
    1_000
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    10
}

fn default_queue_batch_limit() -> usize {
    50
}

/// Capture delivery endpoint configuration
///
/// When enabled, accepted artifacts are posted to the backend capture
/// endpoint; failed sends land in the offline queue.
#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    /// Enable/disable backend delivery
    #[serde(default)]
    pub enabled: bool,

    /// Backend base URL (e.g., `https://api.example.com`)
    pub server_url: Option<String>,

    /// API key for Bearer auth
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_delivery_timeout")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: None,
            api_key: None,
            timeout_secs: default_delivery_timeout(),
        }
    }
}

impl DeliveryConfig {
    /// Check if delivery is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.server_url.is_some() && self.api_key.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.server_url.is_none() {
            return Err(Error::Config(
                "delivery.server_url is required when delivery is enabled".to_string(),
            ));
        }
        if self.api_key.is_none() {
            return Err(Error::Config(
                "delivery.api_key is required when delivery is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_delivery_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/tidemark/config.toml` (~/.config/tidemark/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("tidemark").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/tidemark/` (~/.local/share/tidemark/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("tidemark")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/tidemark/` (~/.local/state/tidemark/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("tidemark")
    }

    /// Returns the database file path
    ///
    /// `$XDG_DATA_HOME/tidemark/data.db` (~/.local/share/tidemark/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/tidemark/tidemark.log` (~/.local/state/tidemark/tidemark.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("tidemark.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path
    /// behavior before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
