//! Run configuration.
//!
//! Settings for a single emulator run, loaded from JSON. Every field has a
//! default so a config file only needs to name what it changes; command
//! line flags override the file.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// How a program image is loaded and how long it runs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// ROM address the image is loaded at
    #[serde(default)]
    pub origin: u16,

    /// Initial program counter (defaults to `origin`)
    #[serde(default)]
    pub start_pc: Option<u16>,

    /// Maximum number of instructions to execute
    #[serde(default = "RunConfig::default_max_steps")]
    pub max_steps: u64,

    /// Stop as soon as PC equals this address. Without it the run stops
    /// when PC leaves the loaded image.
    #[serde(default)]
    pub stop_at: Option<u16>,

    /// Initial level of the TEST pin
    #[serde(default)]
    pub test_pin: u8,
}

impl RunConfig {
    fn default_max_steps() -> u64 {
        10_000
    }

    /// Load a config from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Parse a config from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that addresses fit the 12-bit address space.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let addresses = [
            ("origin", Some(self.origin)),
            ("start_pc", self.start_pc),
            ("stop_at", self.stop_at),
        ];
        for (field, value) in addresses {
            if let Some(value) = value {
                if value > 0xFFF {
                    return Err(ConfigError::Invalid(format!(
                        "{} 0x{:X} is outside the 12-bit address space",
                        field, value
                    )));
                }
            }
        }
        if self.test_pin > 1 {
            return Err(ConfigError::Invalid(format!("test_pin must be 0 or 1, got {}", self.test_pin)));
        }
        Ok(())
    }

    /// Program counter the run starts from.
    pub fn entry_point(&self) -> u16 {
        self.start_pc.unwrap_or(self.origin)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            start_pc: None,
            max_steps: Self::default_max_steps(),
            stop_at: None,
            test_pin: 0,
        }
    }
}

/// Errors that can occur while loading a config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("invalid JSON: {0}")]
    ParseError(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.origin, 0);
        assert_eq!(config.max_steps, 10_000);
        assert_eq!(config.stop_at, None);
        assert_eq!(config.entry_point(), 0);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(RunConfig::from_json("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config = RunConfig::from_json(r#"{ "origin": 256, "stop_at": 300 }"#).unwrap();
        assert_eq!(config.origin, 0x100);
        assert_eq!(config.entry_point(), 0x100);
        assert_eq!(config.stop_at, Some(300));
        assert_eq!(config.max_steps, 10_000);
    }

    #[test]
    fn test_start_pc_overrides_origin() {
        let config = RunConfig::from_json(r#"{ "origin": 16, "start_pc": 20 }"#).unwrap();
        assert_eq!(config.entry_point(), 20);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            RunConfig::from_json(r#"{ "origin": 4096 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RunConfig::from_json(r#"{ "test_pin": 2 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RunConfig::from_json(r#"{ "speed": 1 }"#),
            Err(ConfigError::ParseError(_))
        ));
    }
}
