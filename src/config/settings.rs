//! Configuration structures for (de)serialisation.
//!
//! These structures map directly to the JSON configuration file format. The
//! same document holds the user's installation override and the host's own
//! settings, and is rewritten as a whole whenever the override changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Log levels accepted in `logging.level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// User-configured CS2 `csgo` folder, taking precedence over detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cs2_csgo_path: Option<PathBuf>,

    /// Additional Steam installation roots to search during detection.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steam_roots: Vec<PathBuf>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// The log level is not checked here; an unknown level only affects
    /// logging and falls back to `info` at startup.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .cs2_csgo_path
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(ConfigError::ValidationError {
                message: "cs2_csgo_path must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file location. Defaults to `native_host.log` in the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Returns `true` if `level` is one of [`LOG_LEVELS`], ignoring case.
    #[must_use]
    pub fn is_known_level(&self) -> bool {
        LOG_LEVELS.contains(&self.level.to_lowercase().as_str())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.cs2_csgo_path.is_none());
        assert!(config.steam_roots.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "cs2_csgo_path": "D:/Games/Counter-Strike Global Offensive/game/csgo",
            "steam_roots": ["D:/Steam"],
            "logging": {
                "level": "debug",
                "file": "/tmp/native_host.log"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.cs2_csgo_path,
            Some(PathBuf::from(
                "D:/Games/Counter-Strike Global Offensive/game/csgo"
            ))
        );
        assert_eq!(config.steam_roots, vec![PathBuf::from("D:/Steam")]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/tmp/native_host.log"))
        );
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file.is_none());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        // Older helper versions wrote cs2_replays_path; it must not make the file unreadable.
        let json = r#"{"cs2_replays_path": "C:/old"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.cs2_csgo_path.is_none());
    }

    #[test]
    fn unknown_level_does_not_invalidate_config() {
        let json = r#"{"cs2_csgo_path": "/games/csgo", "logging": {"level": "verbose"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.logging.is_known_level());
        assert!(LoggingConfig::default().is_known_level());
    }

    #[test]
    fn reject_empty_override() {
        let json = r#"{"cs2_csgo_path": ""}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_serialises_compactly() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert_eq!(json, r#"{"logging":{"level":"info"}}"#);
    }
}
