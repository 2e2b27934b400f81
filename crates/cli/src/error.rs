//! Error types for CLI operations.

use contracts::SyncError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded
    #[error("Failed to load configuration from {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: SyncError,
    },

    /// Input could not be opened or read
    #[error("Failed to read input {input}: {source}")]
    Input {
        input: String,
        #[source]
        source: std::io::Error,
    },

    /// Synchronization aborted
    #[error("Synchronization failed: {0}")]
    Sync(#[from] SyncError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config(path: impl Into<String>, source: SyncError) -> Self {
        Self::Config {
            path: path.into(),
            source,
        }
    }

    pub fn input(input: impl Into<String>, source: std::io::Error) -> Self {
        Self::Input {
            input: input.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
