//! Configuration file support for emotionspeak
//!
//! Reads from .emotionspeak/config.toml, found by walking up from the current
//! directory. `EMOTIONSPEAK_ENDPOINT` overrides the service URL.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENDPOINT_ENV: &str = "EMOTIONSPEAK_ENDPOINT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration structure
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Upstream analysis/TTS service
    #[serde(default)]
    pub service: ServiceConfig,

    /// Chart containers and word cloud look
    #[serde(default)]
    pub charts: ChartSettings,

    /// Local viewer server
    #[serde(default)]
    pub serve: ServeConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Base URL the `/analyze`, `/tts` and `/voices` routes hang off
    /// Default: "http://127.0.0.1:5000"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Where charts mount and how the word cloud is laid out.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChartSettings {
    #[serde(default = "default_emotions_container")]
    pub emotions_container: String,

    #[serde(default = "default_wordcloud_container")]
    pub wordcloud_container: String,

    #[serde(default = "default_grid_size")]
    pub grid_size: u32,

    #[serde(default = "default_weight_factor")]
    pub weight_factor: u32,

    #[serde(default = "default_font_family")]
    pub font_family: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServeConfig {
    /// Default: 3001
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_emotions_container() -> String {
    "emotions-chart".to_string()
}

fn default_wordcloud_container() -> String {
    "wordcloud-container".to_string()
}

fn default_grid_size() -> u32 {
    16
}

fn default_weight_factor() -> u32 {
    10
}

fn default_font_family() -> String {
    "Microsoft YaHei".to_string()
}

fn default_port() -> u16 {
    3001
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            emotions_container: default_emotions_container(),
            wordcloud_container: default_wordcloud_container(),
            grid_size: default_grid_size(),
            weight_factor: default_weight_factor(),
            font_family: default_font_family(),
        }
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

impl Config {
    /// Load config from .emotionspeak/config.toml, then apply the environment.
    /// Returns default config if no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_path() {
            Some(path) => Self::from_path(&path)?,
            None => Self::default(),
        };
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                config.service.base_url = endpoint;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Find config.toml by walking up directory tree
    fn find_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(".emotionspeak").join("config.toml");
            if config_path.exists() {
                return Some(config_path);
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
        None
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.service.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "service.base_url must be an http(s) URL, got '{}'",
                self.service.base_url
            )));
        }
        if self.charts.emotions_container == self.charts.wordcloud_container {
            return Err(ConfigError::Invalid(
                "charts.emotions_container and charts.wordcloud_container must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Replace the service URL, e.g. from a `--endpoint` flag.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.service.base_url = endpoint;
        }
        self
    }
}
