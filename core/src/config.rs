use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure for Spanview.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub view: ViewConfig,

    #[serde(default)]
    pub critical_path: CriticalPathConfig,

    #[serde(default)]
    pub focus: FocusConfig,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from a TOML file, using defaults when the file does not
    /// exist. A file that exists but fails to parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Get the default configuration as a TOML string.
    pub fn default_toml() -> Result<String> {
        let config = Self::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }

    /// Validate the configuration for obvious misconfiguration.
    pub fn validate(&self) -> Result<()> {
        if self.critical_path.cache_capacity == 0 {
            anyhow::bail!("critical_path.cache_capacity must be greater than 0");
        }

        if self.focus.pane_id.trim().is_empty() {
            anyhow::bail!("focus.pane_id cannot be empty");
        }

        if self
            .focus
            .same_trace_query_types
            .iter()
            .any(|t| t.trim().is_empty())
        {
            anyhow::bail!("focus.same_trace_query_types cannot contain empty entries");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("Invalid log level: {}", other),
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse config")?;
        Ok(config)
    }
}

/// Initial state of a freshly opened trace.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
    /// Fold every subtree when a new trace is opened
    #[serde(default)]
    pub collapse_on_load: bool,

    /// Compute and highlight the critical path
    #[serde(default = "default_true")]
    pub critical_path: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            collapse_on_load: false,
            critical_path: true,
        }
    }
}

/// Critical path memoization.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CriticalPathConfig {
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for CriticalPathConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Focus link resolution.
///
/// `same_trace_query_types` lists the query types for which a link back to the
/// displayed trace toggles focus in place instead of opening a split view.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FocusConfig {
    #[serde(default = "default_same_trace_query_types")]
    pub same_trace_query_types: Vec<String>,

    #[serde(default)]
    pub datasource_uid: Option<String>,

    #[serde(default)]
    pub datasource_name: Option<String>,

    #[serde(default = "default_pane_id")]
    pub pane_id: String,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            same_trace_query_types: default_same_trace_query_types(),
            datasource_uid: None,
            datasource_name: None,
            pane_id: default_pane_id(),
        }
    }
}

/// Where to read the frontend settings payload from.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct SettingsConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub include_modules: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            include_modules: false,
        }
    }
}

// Default providers ---------------------------------------------------------

fn default_true() -> bool {
    true
}

fn default_cache_capacity() -> usize {
    crate::critical_path::DEFAULT_CACHE_CAPACITY
}

fn default_same_trace_query_types() -> Vec<String> {
    vec!["traceql".to_string()]
}

fn default_pane_id() -> String {
    "left".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// Tests ---------------------------------------------------------------------
