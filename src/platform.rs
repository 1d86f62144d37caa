//! Operating-system side effects behind injectable traits.
//!
//! The dispatcher never calls the clipboard or mutates the file system
//! directly; it goes through [`ClipboardWriter`] and [`FileSystem`] so tests
//! can substitute recording or failing implementations.

use std::io;
use std::path::Path;

use thiserror::Error;

/// Clipboard access failed.
#[derive(Debug, Error)]
#[error("clipboard unavailable: {message}")]
pub struct ClipboardError {
    /// Description from the platform backend.
    pub message: String,
}

/// Places text on a clipboard.
pub trait ClipboardWriter {
    /// Replaces the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the clipboard cannot be opened or written.
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The system clipboard, opened lazily on first use.
///
/// The handle is kept for the lifetime of the host. On X11 and Wayland the
/// owning process serves the selection, so dropping it early would empty the
/// clipboard again.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    /// Creates a clipboard handle that connects on first use.
    #[must_use]
    pub const fn new() -> Self {
        Self { inner: None }
    }
}

impl ClipboardWriter for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let to_error = |e: arboard::Error| ClipboardError {
            message: e.to_string(),
        };

        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(to_error)?,
        };

        self.inner
            .insert(clipboard)
            .set_text(text.to_owned())
            .map_err(to_error)
    }
}

/// File-system mutations performed by request handlers.
pub trait FileSystem {
    /// Moves `from` to `to`, replacing `to` if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the rename fails.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Deletes the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn os_file_system_renames_and_removes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.dem");
        let b = dir.path().join("b.dem");
        std::fs::write(&a, b"demo").unwrap();

        let fs = OsFileSystem;
        fs.rename(&a, &b).unwrap();
        assert!(!a.exists());
        assert_eq!(std::fs::read(&b).unwrap(), b"demo");

        fs.remove_file(&b).unwrap();
        assert!(!b.exists());
    }

    #[test]
    fn os_file_system_rename_replaces_target() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.dem");
        let b = dir.path().join("b.dem");
        std::fs::write(&a, b"new").unwrap();
        std::fs::write(&b, b"old").unwrap();

        OsFileSystem.rename(&a, &b).unwrap();
        assert_eq!(std::fs::read(&b).unwrap(), b"new");
    }

    #[test]
    fn clipboard_error_display() {
        let err = ClipboardError {
            message: "no display".to_string(),
        };
        assert_eq!(err.to_string(), "clipboard unavailable: no display");
    }
}
