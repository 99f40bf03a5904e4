//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/localtime/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/localtime/` (~/.config/localtime/)
//! - State/Logs: `$XDG_STATE_HOME/localtime/` (~/.local/state/localtime/)

use crate::error::{Error, Result};
use crate::format::{DisplayZone, TimeFormatter};
use crate::locale::LocaleTag;
use serde::Deserialize;
use std::path::{Path, PathBuf};

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

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// How timestamps are rendered
    #[serde(default)]
    pub display: DisplayConfig,

    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Viewer settings for rendered dates
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DisplayConfig {
    /// Locale tag; the host locale is used when unset
    pub locale: Option<LocaleTag>,

    /// Zone in which calendar dates are taken
    #[serde(default)]
    pub zone: DisplayZone,
}

impl DisplayConfig {
    /// Configured locale, else the host's, else `en-US`
    pub fn resolved_locale(&self) -> LocaleTag {
        self.locale
            .clone()
            .or_else(LocaleTag::from_env)
            .unwrap_or_default()
    }

    pub fn formatter(&self) -> TimeFormatter {
        TimeFormatter::new(self.resolved_locale(), self.zone)
    }
}

/// Watch mode configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    /// Milliseconds between checks of the watched file
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_poll_ms(),
        }
    }
}

impl WatchConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.poll_ms == 0 {
            return Err(Error::Config(
                "watch.poll_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_poll_ms() -> u64 {
    500
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.watch.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/localtime/config.toml` (~/.config/localtime/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("localtime").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/localtime/` (~/.local/state/localtime/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("localtime")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/localtime/localtime.log` (~/.local/state/localtime/localtime.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("localtime.log")
    }
}
