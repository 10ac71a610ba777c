//! Configuration Module
//!
//! Provides TOML-based configuration for netlens.
//! Configuration is optional - CLI arguments can override file settings.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub view: ViewConfig,
    pub ui: UiConfig,
}

impl Config {
    /// File name probed in the working directory when no path is given
    pub const DEFAULT_PATH: &'static str = "netlens.toml";

    /// Loads configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads configuration from file if it exists, otherwise returns defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p,
            None => {
                let fallback = Path::new(Self::DEFAULT_PATH);
                if !fallback.exists() {
                    return Self::default();
                }
                fallback
            }
        };
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Self::default()
        })
    }

    /// Generates a default configuration file content
    pub fn generate_default() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| "# Failed to generate config".to_string())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.is_empty() {
            anyhow::bail!("backend.base_url must not be empty");
        }
        if !self.backend.base_url.starts_with("http") {
            anyhow::bail!("backend.base_url must be an http(s) URL");
        }
        if self.backend.timeout_secs == 0 {
            anyhow::bail!("backend.timeout_secs must be greater than 0");
        }
        if self.view.poll_interval_secs == 0 {
            anyhow::bail!("view.poll_interval_secs must be at least 1");
        }
        if self.view.top_talkers == 0 {
            anyhow::bail!("view.top_talkers must be greater than 0");
        }
        if self.view.capture_limit == 0 || self.view.prediction_limit == 0 {
            anyhow::bail!("view.capture_limit and view.prediction_limit must be greater than 0");
        }
        if self.ui.tick_ms < 10 {
            anyhow::bail!("ui.tick_ms must be at least 10");
        }
        Ok(())
    }
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the traffic monitoring backend
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            timeout_secs: 10,
        }
    }
}

/// View behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Live refresh cadence in seconds
    pub poll_interval_secs: u64,
    /// How many clients the talkers chart shows
    pub top_talkers: usize,
    /// Capture rows requested per drill-down
    pub capture_limit: usize,
    /// Prediction rows requested per drill-down
    pub prediction_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            top_talkers: 10,
            capture_limit: 50,
            prediction_limit: 50,
        }
    }
}

/// Terminal UI configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    /// Color theme
    pub theme: Theme,
    /// Input poll interval in milliseconds
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            tick_ms: 100,
        }
    }
}

/// Dashboard color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}
