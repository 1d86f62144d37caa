//! Steam library discovery.
//!
//! Finds Steam roots through the Windows registry and platform convention,
//! expands them through `steamapps/libraryfolders.vdf`, and looks for a
//! Counter-Strike 2 installation in each library.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

/// Folder names CS2 has been installed under inside `steamapps/common`.
pub const CS2_FOLDER_NAMES: [&str; 3] = [
    "Counter-Strike Global Offensive",
    "Counter-Strike 2",
    "csgo",
];

/// Content folder layouts inside an installation, newest first.
const CONTENT_SUBDIRS: [&[&str]; 2] = [&["game", "csgo"], &["csgo"]];

/// Executable locations inside an installation.
const EXECUTABLE_SUBPATHS: [&[&str]; 3] = [
    &["game", "bin", "win64", "cs2.exe"],
    &["game", "bin", "linuxsteamrt64", "cs2"],
    &["cs2.exe"],
];

/// Searches a fixed list of Steam roots for CS2 installations.
#[derive(Debug, Clone, Default)]
pub struct SteamLocator {
    roots: Vec<PathBuf>,
}

impl SteamLocator {
    /// Creates a locator that searches exactly `roots`, in order.
    #[must_use]
    pub const fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    /// Returns the configured roots.
    #[must_use]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Returns every existing Steam library, roots first, then
    /// `libraryfolders.vdf` entries in file order.
    #[must_use]
    pub fn libraries(&self) -> Vec<PathBuf> {
        let mut libraries = Vec::new();

        for root in self.roots.iter().filter(|r| r.is_dir()) {
            push_unique(&mut libraries, root.clone());

            let vdf_path = root.join("steamapps").join("libraryfolders.vdf");
            let content = match std::fs::read_to_string(&vdf_path) {
                Ok(content) => content,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %vdf_path.display(), "No libraryfolders.vdf");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(path = %vdf_path.display(), error = %e, "Failed to read libraryfolders.vdf");
                    continue;
                }
            };

            for library in parse_library_folders(&content) {
                if library.is_dir() {
                    tracing::debug!(library = %library.display(), "Found Steam library");
                    push_unique(&mut libraries, library);
                }
            }
        }

        libraries
    }

    /// Returns CS2 installation directories across all libraries.
    #[must_use]
    pub fn installations(&self) -> Vec<PathBuf> {
        let mut installs = Vec::new();
        for library in self.libraries() {
            let common = library.join("steamapps").join("common");
            for name in CS2_FOLDER_NAMES {
                let install = common.join(name);
                if install.is_dir() {
                    push_unique(&mut installs, install);
                }
            }
        }
        installs
    }

    /// Returns the content folders demos must be placed in, most likely first.
    #[must_use]
    pub fn content_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for install in self.installations() {
            for subdir in CONTENT_SUBDIRS {
                let candidate = join_all(&install, subdir);
                if candidate.is_dir() {
                    push_unique(&mut dirs, candidate);
                }
            }
        }
        dirs
    }

    /// Returns the first game executable found.
    #[must_use]
    pub fn executable(&self) -> Option<PathBuf> {
        self.installations().into_iter().find_map(|install| {
            EXECUTABLE_SUBPATHS
                .iter()
                .map(|sub| join_all(&install, sub))
                .find(|p| p.is_file())
        })
    }
}

static LIBRARY_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""path"\s+"([^"]+)""#).expect("libraryfolders pattern is valid")
});

/// Registry keys holding the Steam install directory, most specific first.
#[cfg(windows)]
const STEAM_REGISTRY_KEYS: [&str; 2] = [
    r"SOFTWARE\WOW6432Node\Valve\Steam",
    r"SOFTWARE\Valve\Steam",
];

/// Extracts library paths from the contents of a `libraryfolders.vdf` file.
///
/// Only the `"path"` keys are read; the file's nesting is not interpreted.
#[must_use]
pub fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    LIBRARY_PATH
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| PathBuf::from(m.as_str().replace("\\\\", "\\")))
        .collect()
}

/// Returns the Steam roots for the current platform: the install directory
/// recorded in the registry on Windows, then the conventional locations.
#[must_use]
pub fn platform_steam_roots() -> Vec<PathBuf> {
    merge_roots(registry_steam_roots(), conventional_steam_roots())
}

/// Reads the Steam install directory from the registry.
///
/// Checks `HKLM\SOFTWARE\WOW6432Node\Valve\Steam`, `HKLM\SOFTWARE\Valve\Steam`
/// and `HKCU\SOFTWARE\Valve\Steam` for `InstallPath`, then the per-user
/// `SteamPath` value.
#[cfg(windows)]
fn registry_steam_roots() -> Vec<PathBuf> {
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);

    let mut lookups: Vec<(&RegKey, &str, &str)> = STEAM_REGISTRY_KEYS
        .iter()
        .map(|key| (&hklm, *key, "InstallPath"))
        .collect();
    lookups.push((&hkcu, r"SOFTWARE\Valve\Steam", "InstallPath"));
    lookups.push((&hkcu, r"SOFTWARE\Valve\Steam", "SteamPath"));

    let mut roots = Vec::new();
    for (hive, subkey, value) in lookups {
        match hive
            .open_subkey(subkey)
            .and_then(|key| key.get_value::<String, _>(value))
        {
            Ok(path) if !path.is_empty() => {
                tracing::debug!(key = subkey, value, path = %path, "Steam root from registry");
                push_unique(&mut roots, PathBuf::from(path));
            }
            Ok(_) => {}
            Err(e) => tracing::trace!(key = subkey, value, error = %e, "Registry value not present"),
        }
    }
    roots
}

#[cfg(not(windows))]
const fn registry_steam_roots() -> Vec<PathBuf> {
    Vec::new()
}

/// Returns the conventional Steam install locations for the current platform.
fn conventional_steam_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(windows)]
    {
        for var in ["ProgramFiles(x86)", "ProgramFiles"] {
            if let Some(dir) = std::env::var_os(var) {
                push_unique(&mut roots, PathBuf::from(dir).join("Steam"));
            }
        }
        push_unique(&mut roots, PathBuf::from(r"C:\Program Files (x86)\Steam"));
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(data) = dirs::data_dir() {
            push_unique(&mut roots, data.join("Steam"));
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if let Some(home) = dirs::home_dir() {
            push_unique(&mut roots, home.join(".steam").join("steam"));
        }
        if let Some(data) = dirs::data_dir() {
            push_unique(&mut roots, data.join("Steam"));
        }
        if let Some(home) = dirs::home_dir() {
            push_unique(
                &mut roots,
                home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam"),
            );
        }
    }

    roots
}

/// Concatenates root lists, keeping the first occurrence of each path.
fn merge_roots(first: Vec<PathBuf>, then: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut roots = Vec::with_capacity(first.len() + then.len());
    for root in first.into_iter().chain(then) {
        push_unique(&mut roots, root);
    }
    roots
}

fn join_all(base: &Path, parts: &[&str]) -> PathBuf {
    parts.iter().fold(base.to_path_buf(), |p, part| p.join(part))
}

fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}
