//! Error types.
//!
//! Only conditions that end a session or stop startup are errors. Unknown
//! commands, incomplete lines and missing option sequences are normal
//! control flow and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a single session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Receive buffer is full and holds no complete line.
    #[error("line exceeds receive buffer of {capacity} bytes")]
    LineTooLong { capacity: usize },
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {source}", .path.display())]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
