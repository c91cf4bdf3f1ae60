//! Error types for cursor operations, size probing and configuration.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a cursor position query.
#[derive(Error, Debug)]
pub enum CursorError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Terminal did not answer the position query within {0:?}")]
    Timeout(Duration),

    #[error("Malformed cursor position reply: {0:?}")]
    MalformedReply(String),
}

/// Failure of a single terminal-size strategy.
///
/// These never escape the size probe; the next strategy in the chain is
/// tried instead.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Strategy is not available on this platform or stream")]
    Unsupported,

    #[error("Environment variable {0} is not set")]
    Missing(&'static str),

    #[error("Could not parse terminal dimension")]
    Parse,

    #[error("Size query failed: {0}")]
    Io(#[from] io::Error),

    #[error("Size query returned unusable dimensions {width}x{height}")]
    Invalid { width: i32, height: i32 },
}

/// Failure while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CursorError>;
