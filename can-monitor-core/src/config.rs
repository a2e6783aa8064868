//! Session configuration
//!
//! Minimal configuration for a monitoring session. Process-level concerns
//! (argument parsing, config file discovery) live in the application
//! layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What a session persists at stop time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Record which message types and signal names appeared; no per-frame
    /// values are persisted
    Discovery,
    /// Buffer decoded signal rows and persist them as a CSV log
    Logging,
}

/// Configuration for a monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session mode
    pub mode: SessionMode,

    /// Directory for flushed output files
    pub output_dir: PathBuf,

    /// Bounded wait per frame poll, in milliseconds; the cancellation
    /// flag is re-checked at least this often while the bus is silent
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,

    /// Optional signal allow-list for logging mode (None = log everything)
    #[serde(default)]
    pub signal_filter: Option<Vec<String>>,
}

fn default_poll_timeout_ms() -> u64 {
    1000
}

impl SessionConfig {
    /// Create a configuration with default timeout and no filter
    pub fn new(mode: SessionMode, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            output_dir: output_dir.into(),
            poll_timeout_ms: default_poll_timeout_ms(),
            signal_filter: None,
        }
    }

    /// Builder method: set the poll timeout
    pub fn with_poll_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.poll_timeout_ms = timeout_ms;
        self
    }

    /// Builder method: set the signal allow-list
    pub fn with_signal_filter(mut self, signals: Vec<String>) -> Self {
        self.signal_filter = Some(signals);
        self
    }

    /// Poll timeout as a Duration
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}
