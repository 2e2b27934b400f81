//! Layered error definitions
//!
//! Categorized by source: sync / config / input

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Sync Errors =====
    /// A label's bounded queue is already holding `limit` values.
    ///
    /// Terminal for the synchronizer that raised it.
    #[error("max back pressure ({limit}) exceeded for label '{label}'")]
    BackpressureOverflow { label: String, limit: usize },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Malformed input record
    #[error("invalid record at line {line}: {message}")]
    Record { line: u64, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Create backpressure overflow error
    pub fn backpressure_overflow(label: impl ToString, limit: usize) -> Self {
        Self::BackpressureOverflow {
            label: label.to_string(),
            limit,
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create input record error
    pub fn record(line: u64, message: impl Into<String>) -> Self {
        Self::Record {
            line,
            message: message.into(),
        }
    }

    /// Whether this error came from a synchronizer queue overflowing
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::BackpressureOverflow { .. })
    }
}
