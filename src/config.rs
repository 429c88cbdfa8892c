//! Configuration for the latency probe.
//!
//! Loads configuration from TOML file at `~/.config/xlatency/config.toml`.
//! Auto-generates default config file on first run if missing. Command-line
//! flags override anything set here.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::probe::Rect;

/// Wait bound applied when neither the config file nor the CLI set one.
pub const DEFAULT_WAIT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Max time in seconds to collect damage after a probe; 0 waits forever.
    pub wait_secs: u64,
    /// Region to monitor for damage; full screen when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorRect>,
    /// Measurement log destination; stdout when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

/// Serializable form of the monitored rectangle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonitorRect {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl From<MonitorRect> for Rect {
    fn from(rect: MonitorRect) -> Self {
        Rect::new(rect.x, rect.y, rect.width, rect.height)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wait_secs: DEFAULT_WAIT_SECS,
            monitor: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("xlatency");

        Ok(config_dir.join("config.toml"))
    }

    fn save_default(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(&Self::default()).context("Failed to serialize default config")?;
        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.wait_secs, DEFAULT_WAIT_SECS);
        assert!(config.monitor.is_none());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            wait_secs = 0
            log_file = "/tmp/probe.log"

            [monitor]
            x = 10
            y = 20
            width = 600
            height = 400
            "#,
        )
        .unwrap();

        assert_eq!(config.wait_secs, 0);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/probe.log")));
        let rect: Rect = config.monitor.unwrap().into();
        assert_eq!(rect, Rect::new(10, 20, 600, 400));
    }

    #[test]
    fn test_default_config_roundtrips_through_toml() {
        let serialized = toml::to_string_pretty(&Config::default()).unwrap();
        let config: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.wait_secs, DEFAULT_WAIT_SECS);
    }
}
