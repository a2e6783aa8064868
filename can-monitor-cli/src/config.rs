//! Configuration loading and parsing

use anyhow::{Context, Result};
use can_monitor_core::SessionMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
///
/// Command-line arguments override individual fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Pre-parsed catalog JSON file
    pub catalog: PathBuf,

    /// Frame replay file (JSON lines)
    #[serde(default)]
    pub frames: Option<PathBuf>,

    /// Session mode
    #[serde(default = "default_mode")]
    pub mode: SessionMode,

    /// Output directory for session files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Signal allow-list for logging mode
    #[serde(default)]
    pub signals: Option<Vec<String>>,

    /// Frame poll timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_mode() -> SessionMode {
    SessionMode::Discovery
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("CAN_LOGS")
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Load and parse a TOML configuration file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {:?}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str(r#"catalog = "ccan.json""#).unwrap();
        assert_eq!(config.catalog, PathBuf::from("ccan.json"));
        assert_eq!(config.mode, SessionMode::Discovery);
        assert_eq!(config.output_dir, PathBuf::from("CAN_LOGS"));
        assert_eq!(config.timeout_ms, 1000);
        assert!(config.frames.is_none());
        assert!(config.signals.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            catalog = "ccan.json"
            frames = "trace.jsonl"
            mode = "logging"
            output_dir = "/data/can"
            signals = ["SAS_Angle", "YAW_RATE"]
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, SessionMode::Logging);
        assert_eq!(config.output_dir, PathBuf::from("/data/can"));
        assert_eq!(
            config.signals,
            Some(vec!["SAS_Angle".to_string(), "YAW_RATE".to_string()])
        );
        assert_eq!(config.timeout_ms, 250);
    }
}
