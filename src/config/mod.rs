//! Configuration
//!
//! A single JSON5 file with camelCase keys. Every section has defaults, so a
//! missing file is a valid configuration. Secrets can come from the
//! environment instead of the file.

use crate::channels::DiscordConfig;
use crate::election::MAX_CANDIDATES;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "MARQUEE_CONFIG_PATH";

/// Overrides `discord.botToken`
pub const DISCORD_TOKEN_ENV: &str = "MARQUEE_DISCORD_TOKEN";

const APP_DIR: &str = "marquee";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub suggestions: SuggestionsConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Suggestion list settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionsConfig {
    /// Longest list a guild may build
    pub max_suggestions: usize,
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            max_suggestions: MAX_CANDIDATES,
        }
    }
}

/// Suggestion store settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Store file; defaults to the user data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Store file to open
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("store.json")
        })
    }
}

impl Config {
    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(DISCORD_TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            debug!("Discord token taken from {}", DISCORD_TOKEN_ENV);
            self.discord.bot_token = token;
        }
    }

    /// Reject values nothing downstream can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.suggestions.max_suggestions == 0 {
            return Err(ConfigError::Invalid(
                "suggestions.maxSuggestions must be at least 1".to_string(),
            ));
        }
        if self.discord.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "discord.requestTimeoutSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolved config file path
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.json5")
}

/// Load a config file without environment overrides. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = json5::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration from the resolved path, with environment overrides
pub fn load_config() -> Result<Config, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}
