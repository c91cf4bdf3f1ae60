//! Configuration for termcursor.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.termcursor/config.toml`
//! - The constant size fallback used when every size strategy fails
//! - Position query tuning (optional timeout, poll interval)
//! - Log destination and level for the demo binary
//!
//! # Configuration File
//!
//! The file is located at `~/.termcursor/config.toml`, or wherever the
//! `TERMCURSOR_CONFIG` environment variable points:
//!
//! ```toml
//! [size]
//! fallback_width = 79
//! fallback_height = 24
//!
//! # Omit timeout_ms to block until the terminal answers.
//! [query]
//! timeout_ms = 500
//! poll_interval_ms = 1
//!
//! [log]
//! level = "debug"
//! file = "/tmp/termcursor.log"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "TERMCURSOR_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size fallback settings
    pub size: SizeConfig,
    /// Cursor position query settings
    pub query: QueryConfig,
    /// Logging settings
    pub log: LogConfig,
}

/// Size fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    pub fallback_width: u16,
    pub fallback_height: u16,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            fallback_width: 79,
            fallback_height: 24,
        }
    }
}

/// Position query configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Give up on a terminal reply after this many milliseconds.
    /// `None` blocks the calling thread until a reply arrives.
    pub timeout_ms: Option<u64>,
    /// Sleep between empty polls of the input stream
    pub poll_interval_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            poll_interval_ms: 1,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "termcursor=debug"
    pub level: String,
    /// Log file path; defaults to `~/.termcursor/termcursor.log`
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// A missing file yields defaults silently; an unreadable or invalid
    /// file yields defaults and a warning.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Get config file path
    pub fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the log file path, falling back to the config directory
    pub fn log_path(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("termcursor.log")))
            .unwrap_or_else(|| PathBuf::from("termcursor.log"))
    }
}

// Get the ~/.termcursor directory
fn config_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(|home| PathBuf::from(home).join(".termcursor"))
}
