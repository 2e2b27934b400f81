//! Synchronizer options that can be shared across crates.

use serde::{Deserialize, Serialize};

/// Label synchronizer configuration
///
/// Resolved once when a synchronizer is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Emit on every qualifying input instead of waiting for all labels
    pub merge_only: bool,

    /// Clear emitted labels after each tuple (otherwise carry values forward)
    pub reset: bool,

    /// Allow one final, possibly partial, tuple on completion
    pub all: bool,

    /// Per-label queue limit; `0` keeps only the latest value per label
    pub back_pressure: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            merge_only: false,
            reset: true,
            all: true,
            back_pressure: 0,
        }
    }
}

impl SyncOptions {
    /// Buffering regime selected by these options
    pub fn mode(&self) -> BufferMode {
        if self.back_pressure >= 1 {
            BufferMode::BoundedFifo {
                limit: self.back_pressure,
            }
        } else {
            BufferMode::UnboundedLatest
        }
    }

    /// Flags that are set but have no effect in the selected mode
    pub fn ignored_flags(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if let BufferMode::BoundedFifo { .. } = self.mode() {
            if self.merge_only {
                ignored.push("merge_only");
            }
            if !self.reset {
                ignored.push("reset");
            }
        }
        ignored
    }
}

/// Buffering regime of a synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferMode {
    /// Keep only the most recent value per label
    UnboundedLatest,
    /// Keep up to `limit` values per label, matched in arrival order
    BoundedFifo { limit: usize },
}
