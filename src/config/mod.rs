//! Configuration file loading and persistence.
//!
//! The host keeps one small JSON document on disk. It is read leniently
//! (a missing or corrupt file behaves like an empty one) and written
//! atomically so an interrupted write never leaves a truncated document.
//!
//! # Configuration File Locations
//!
//! 1. Path specified via `--config` CLI flag
//! 2. Default location:
//!    - **Windows:** `%APPDATA%\faceit-demo-host\config.json`
//!    - **Linux:** `~/.config/faceit-demo-host/config.json`
//!    - **macOS:** `~/Library/Application Support/faceit-demo-host/config.json`

mod settings;

pub use settings::{Config, LoggingConfig, LOG_LEVELS};

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::ConfigError;

/// Directory name used under the platform configuration directory.
pub const APP_DIR_NAME: &str = "faceit-demo-host";

/// Returns the default configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR_NAME))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Returns the platform-specific default log file path.
#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("native_host.log"))
}

/// A file-backed configuration store.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the platform-specific default location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoConfigDir`] if the platform has no config directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        default_config_path()
            .map(Self::new)
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and validates the configuration file.
    ///
    /// Returns `Ok(None)` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the JSON is malformed,
    /// or validation fails.
    pub fn read(&self) -> Result<Option<Config>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;

        let config: Config =
            serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: self.path.clone(),
                source: e,
            })?;

        config.validate()?;

        Ok(Some(config))
    }

    /// Loads the configuration, treating a missing or unusable file as empty.
    #[must_use]
    pub fn load(&self) -> Config {
        match self.read() {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unusable configuration file");
                Config::default()
            }
        }
    }

    /// Writes the whole configuration document atomically.
    ///
    /// The document is written to a temporary file beside the target and
    /// renamed over it, so readers see either the old or the new content.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the file cannot be written.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;

        let write_error = |source: std::io::Error| ConfigError::WriteError {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_error)?;

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| write_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(write_error)?;
        temp.write_all(json.as_bytes()).map_err(write_error)?;
        temp.write_all(b"\n").map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        temp.persist(&self.path).map_err(|e| write_error(e.error))?;

        tracing::info!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    /// Updates the configuration with `update` and saves it.
    ///
    /// Keys not touched by `update` are preserved. A file that is not valid
    /// JSON is replaced; a file that parses but fails validation is left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file cannot be read or fails
    /// validation, or if the updated configuration cannot be saved.
    pub fn update(&self, update: impl FnOnce(&mut Config)) -> Result<Config, ConfigError> {
        let mut config = match self.read() {
            Ok(config) => config.unwrap_or_default(),
            Err(e @ ConfigError::ParseError { .. }) => {
                tracing::warn!(error = %e, "Replacing corrupt configuration file");
                Config::default()
            }
            Err(e) => return Err(e),
        };
        update(&mut config);
        self.save(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_path_ends_with_file_name() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("faceit-demo-host/config.json"));
        }
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        assert!(store.read().unwrap().is_none());
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn corrupt_file_loads_as_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::new(&path);
        assert!(matches!(store.read(), Err(ConfigError::ParseError { .. })));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn save_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("config.json"));

        let config = Config {
            cs2_csgo_path: Some(PathBuf::from("/games/cs2/game/csgo")),
            ..Config::default()
        };
        store.save(&config).unwrap();

        assert_eq!(store.read().unwrap(), Some(config));
    }

    #[test]
    fn save_leaves_no_temporary_files() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store.save(&Config::default()).unwrap();
        store.save(&Config::default()).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn update_preserves_other_keys() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store
            .save(&Config {
                steam_roots: vec![PathBuf::from("/opt/steam")],
                ..Config::default()
            })
            .unwrap();

        store
            .update(|c| c.cs2_csgo_path = Some(PathBuf::from("/games/csgo")))
            .unwrap();

        let config = store.read().unwrap().unwrap();
        assert_eq!(config.steam_roots, vec![PathBuf::from("/opt/steam")]);
        assert_eq!(config.cs2_csgo_path, Some(PathBuf::from("/games/csgo")));
    }

    #[test]
    fn invalid_config_is_not_saved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = ConfigStore::new(&path);

        let config = Config {
            cs2_csgo_path: Some(PathBuf::new()),
            ..Config::default()
        };
        assert!(store.save(&config).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn unknown_log_level_keeps_the_rest_of_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cs2_csgo_path": "/games/csgo", "steam_roots": ["/opt/steam"], "logging": {"level": "verbose"}}"#,
        )
        .unwrap();
        let store = ConfigStore::new(&path);

        let loaded = store.load();
        assert_eq!(loaded.cs2_csgo_path, Some(PathBuf::from("/games/csgo")));
        assert_eq!(loaded.logging.level, "verbose");

        store
            .update(|c| c.cs2_csgo_path = Some(PathBuf::from("/games/other")))
            .unwrap();
        let config = store.read().unwrap().unwrap();
        assert_eq!(config.steam_roots, vec![PathBuf::from("/opt/steam")]);
        assert_eq!(config.cs2_csgo_path, Some(PathBuf::from("/games/other")));
        assert_eq!(config.logging.level, "verbose");
    }

    #[test]
    fn update_refuses_to_overwrite_invalid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let original = r#"{"cs2_csgo_path": "", "steam_roots": ["/opt/steam"]}"#;
        std::fs::write(&path, original).unwrap();
        let store = ConfigStore::new(&path);

        let err = store
            .update(|c| c.cs2_csgo_path = Some(PathBuf::from("/games/csgo")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn update_replaces_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::new(&path);

        store
            .update(|c| c.cs2_csgo_path = Some(PathBuf::from("/games/csgo")))
            .unwrap();
        assert_eq!(
            store.read().unwrap().unwrap().cs2_csgo_path,
            Some(PathBuf::from("/games/csgo"))
        );
    }
}
