//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File contents could not be parsed
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// An environment override holds an unusable value
    #[error("Invalid value for {name}: {message}")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// Parse failure description
        message: String,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
}
