//! Configuration management
//!
//! Handles loading and validation of configuration from:
//! - TOML files
//! - CLI arguments (demo binary only)
//!
//! Every field has a default, so an empty file is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod types;

pub use types::{DemoConfig, PointerConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pointer controller configuration
    #[serde(default)]
    pub pointer: PointerConfig,
    /// Demo session configuration
    #[serde(default)]
    pub demo: DemoConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        Ok(Config::default())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.pointer
            .check()
            .context("Invalid [pointer] section")?;

        if self.demo.width <= 0 || self.demo.height <= 0 {
            anyhow::bail!(
                "Demo display must have a positive size, got {}x{}",
                self.demo.width,
                self.demo.height
            );
        }

        if self.demo.vsync_interval_ms == 0 {
            anyhow::bail!("vsync_interval_ms must be at least 1");
        }

        if self.demo.touch_contacts > crate::pointer::types::MAX_POINTER_ID + 1 {
            anyhow::bail!(
                "touch_contacts ({}) exceeds the {} addressable touch ids",
                self.demo.touch_contacts,
                crate::pointer::types::MAX_POINTER_ID + 1
            );
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, display_id: Option<i32>, frame_interval_ms: Option<u64>) -> Self {
        if let Some(display_id) = display_id {
            self.demo.display_id = display_id;
        }
        if let Some(interval) = frame_interval_ms {
            self.pointer.frame_interval_ms = interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config().unwrap();
        assert_eq!(config.pointer.max_spots, 12);
        assert_eq!(config.pointer.inactivity_timeout_normal_ms, 15_000);
        assert_eq!(config.demo.width, 1920);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_spots() {
        let mut config = Config::default_config().unwrap();
        config.pointer.max_spots = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_demo_size() {
        let mut config = Config::default_config().unwrap();
        config.demo.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_too_many_contacts() {
        let mut config = Config::default_config().unwrap();
        config.demo.touch_contacts = 33;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default_config()
            .unwrap()
            .with_overrides(Some(3), Some(8));
        assert_eq!(config.demo.display_id, 3);
        assert_eq!(config.pointer.frame_interval_ms, 8);
    }
}
