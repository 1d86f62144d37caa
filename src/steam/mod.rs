//! Installation directory resolution.
//!
//! The effective CS2 content folder is either the user's override from the
//! config store or the first folder found by [`SteamLocator`]. Nothing is
//! cached: every call re-reads the config and re-checks the file system, so
//! a folder moved while the host is running is picked up on the next request.

pub mod locator;

pub use locator::{platform_steam_roots, SteamLocator};

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::{Config, ConfigStore};
use crate::error::ConfigError;

/// Where a resolved path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Set by the user through `setCS2Path`.
    Configured,
    /// Found by probing Steam libraries.
    Detected,
}

/// A directory believed to be the CS2 content folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// The directory.
    pub path: PathBuf,
    /// Where the path came from.
    pub source: Provenance,
    /// Whether the directory existed when it was resolved.
    pub valid: bool,
}

/// Everything the resolver knows, for display in the extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathReport {
    /// The path requests would currently use.
    pub effective: Option<ResolvedPath>,
    /// The stored override, even if it no longer exists.
    pub configured: Option<ResolvedPath>,
    /// Auto-detected content folders, most likely first.
    pub detected: Vec<PathBuf>,
    /// Steam libraries that were searched.
    pub libraries: Vec<PathBuf>,
    /// The game executable, when found.
    pub executable: Option<PathBuf>,
}

/// Errors from resolving or storing the installation path.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither an override nor a detected installation is available.
    #[error("CS2 csgo folder not found")]
    NotFound,

    /// A path offered as an override is not an existing directory.
    #[error("Invalid path or path does not exist: {}", path.display())]
    InvalidPath {
        /// The rejected path.
        path: PathBuf,
    },

    /// The config store could not be written.
    #[error(transparent)]
    Store(#[from] ConfigError),
}

/// Resolves the CS2 content folder from config and Steam libraries.
#[derive(Debug, Clone)]
pub struct PathResolver {
    store: ConfigStore,
    default_roots: Vec<PathBuf>,
}

impl PathResolver {
    /// Creates a resolver over `store` that searches `default_roots` after
    /// any roots listed in the config.
    #[must_use]
    pub const fn new(store: ConfigStore, default_roots: Vec<PathBuf>) -> Self {
        Self {
            store,
            default_roots,
        }
    }

    /// Creates a resolver that searches the platform's conventional Steam roots.
    #[must_use]
    pub fn with_platform_roots(store: ConfigStore) -> Self {
        Self::new(store, platform_steam_roots())
    }

    /// Returns the backing config store.
    #[must_use]
    pub const fn store(&self) -> &ConfigStore {
        &self.store
    }

    fn locator(&self, config: &Config) -> SteamLocator {
        let roots = config
            .steam_roots
            .iter()
            .chain(&self.default_roots)
            .cloned()
            .collect();
        SteamLocator::new(roots)
    }

    /// Returns existing content folders found in Steam libraries.
    #[must_use]
    pub fn detect(&self) -> Vec<PathBuf> {
        self.locator(&self.store.load()).content_dirs()
    }

    /// Returns the stored override, if any.
    #[must_use]
    pub fn load(&self) -> Option<PathBuf> {
        self.store.load().cs2_csgo_path
    }

    /// Validates and stores `path` as the override.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidPath`] if `path` is not an existing
    /// directory, or [`ResolveError::Store`] if it cannot be persisted.
    pub fn save(&self, path: &Path) -> Result<PathBuf, ResolveError> {
        if !path.is_dir() {
            return Err(ResolveError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let stored = path.to_path_buf();
        self.store
            .update(|config| config.cs2_csgo_path = Some(stored.clone()))?;
        tracing::info!(path = %stored.display(), "Custom path set");
        Ok(stored)
    }

    /// Returns the folder requests should use right now.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NotFound`] if no override is valid and nothing
    /// is detected.
    pub fn resolve_effective(&self) -> Result<ResolvedPath, ResolveError> {
        let config = self.store.load();
        self.effective_from(&config, None)
    }

    fn effective_from(
        &self,
        config: &Config,
        detected: Option<&[PathBuf]>,
    ) -> Result<ResolvedPath, ResolveError> {
        if let Some(custom) = &config.cs2_csgo_path {
            if custom.is_dir() {
                tracing::debug!(path = %custom.display(), "Using user-configured path");
                return Ok(ResolvedPath {
                    path: custom.clone(),
                    source: Provenance::Configured,
                    valid: true,
                });
            }
            tracing::warn!(path = %custom.display(), "Configured path does not exist");
        }

        let first = match detected {
            Some(dirs) => dirs.first().cloned(),
            None => self.locator(config).content_dirs().into_iter().next(),
        };

        first
            .map(|path| ResolvedPath {
                path,
                source: Provenance::Detected,
                valid: true,
            })
            .ok_or(ResolveError::NotFound)
    }

    /// Collects the effective path together with everything that was probed.
    #[must_use]
    pub fn report(&self) -> PathReport {
        let config = self.store.load();
        let locator = self.locator(&config);
        let detected = locator.content_dirs();

        PathReport {
            effective: self.effective_from(&config, Some(&detected)).ok(),
            configured: config.cs2_csgo_path.as_ref().map(|p| ResolvedPath {
                path: p.clone(),
                source: Provenance::Configured,
                valid: p.is_dir(),
            }),
            detected,
            libraries: locator.libraries(),
            executable: locator.executable(),
        }
    }
}
