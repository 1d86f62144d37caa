//! Error types for demo-native-host.
//!
//! Two families live here:
//!
//! - [`ConfigError`]: failures reading or writing the local config store.
//! - [`ActionError`]: failures of a single request. These never end the host
//!   loop; the dispatcher turns each one into a failure response whose `error`
//!   field is [`ActionError::kind`].
//!
//! Stream-level faults are [`crate::native::codec::FramingError`] and are the
//! only errors that terminate the process.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file could not be written.
    #[error("failed to write configuration file: {path}")]
    WriteError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// No configuration location could be determined for this platform.
    #[error("no configuration directory available on this platform")]
    NoConfigDir,

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Longest piece of caller input repeated back in an error message.
pub const MAX_ECHO_CHARS: usize = 256;

/// Shortens `text` to at most `max_chars` characters, marking the cut with
/// an ellipsis.
#[must_use]
pub fn clip(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => Cow::Owned(format!("{}…", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

/// Renders a caller-supplied path for an error message.
#[must_use]
pub fn clip_path(path: &Path) -> String {
    clip(&path.to_string_lossy(), MAX_ECHO_CHARS).into_owned()
}

/// Result type for request handling.
pub type ActionResult<T> = Result<T, ActionError>;

/// Errors produced while handling one request.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The frame decoded to something that is not a usable request.
    #[error("{message}")]
    Protocol {
        /// Description of what's wrong.
        message: String,
    },

    /// The request is well-formed but its input is semantically invalid.
    #[error("{message}")]
    Validation {
        /// Description of what's wrong.
        message: String,
    },

    /// The `action` field names no known action.
    #[error("Unknown action: {action}")]
    UnknownAction {
        /// The action name received.
        action: String,
    },

    /// No installation directory could be found (reported, not fatal).
    #[error("{message}")]
    NotFound {
        /// Description of what was searched.
        message: String,
    },

    /// An operation needed the installation directory and none resolved.
    #[error("CS2 installation not found. Please configure the CS2 folder path manually.")]
    PathResolution,

    /// A file named by the request does not exist.
    #[error("File not found: {}", clip_path(path))]
    FileNotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// The compressed demo could not be decoded into a valid demo file.
    #[error("Decompression failed: {message}")]
    Decompression {
        /// Description of what went wrong.
        message: String,
        /// Underlying I/O error if available.
        #[source]
        source: Option<io::Error>,
    },

    /// A file-system operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl ActionError {
    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an unknown action error. Long names are shortened.
    pub fn unknown_action(action: &str) -> Self {
        Self::UnknownAction {
            action: clip(action, MAX_ECHO_CHARS).into_owned(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a file-not-found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a decompression error.
    pub fn decompression(message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::Decompression {
            message: message.into(),
            source,
        }
    }

    /// Creates an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable kind name sent in the response `error` field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Protocol { .. } => "ProtocolError",
            Self::Validation { .. } => "ValidationError",
            Self::UnknownAction { .. } => "UnknownAction",
            Self::NotFound { .. } => "NotFound",
            Self::PathResolution => "PathResolutionError",
            Self::FileNotFound { .. } => "FileNotFound",
            Self::Decompression { .. } => "DecompressionError",
            Self::Io { .. } => "IOError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::ReadError {
            path: PathBuf::from("/path/to/config.json"),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };
        let msg = error.to_string();
        assert!(msg.contains("failed to read"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn action_error_kinds() {
        assert_eq!(ActionError::protocol("x").kind(), "ProtocolError");
        assert_eq!(ActionError::validation("x").kind(), "ValidationError");
        assert_eq!(ActionError::unknown_action("x").kind(), "UnknownAction");
        assert_eq!(ActionError::not_found("x").kind(), "NotFound");
        assert_eq!(ActionError::PathResolution.kind(), "PathResolutionError");
        assert_eq!(ActionError::file_not_found("x").kind(), "FileNotFound");
        assert_eq!(
            ActionError::decompression("x", None).kind(),
            "DecompressionError"
        );
        assert_eq!(
            ActionError::io("x", io::Error::from(io::ErrorKind::Other)).kind(),
            "IOError"
        );
    }

    #[test]
    fn unknown_action_display() {
        let err = ActionError::unknown_action("launchGame");
        assert_eq!(err.to_string(), "Unknown action: launchGame");
    }

    #[test]
    fn clip_leaves_short_text_alone() {
        assert_eq!(clip("ping", 8), "ping");
        assert_eq!(clip("12345678", 8), "12345678");
    }

    #[test]
    fn clip_cuts_on_char_boundaries() {
        assert_eq!(clip("ääääää", 3), "äää…");
    }

    #[test]
    fn huge_unknown_action_is_shortened() {
        let name = "x".repeat(2 * 1024 * 1024);
        let msg = ActionError::unknown_action(&name).to_string();
        assert!(msg.len() < 1024);
        assert!(msg.starts_with("Unknown action: xxx"));
        assert!(msg.ends_with('…'));
    }

    #[test]
    fn huge_missing_path_is_shortened() {
        let path = PathBuf::from("d".repeat(100_000));
        let msg = ActionError::file_not_found(path).to_string();
        assert!(msg.len() < 1024);
    }

    #[test]
    fn io_error_display_includes_context() {
        let err = ActionError::io(
            "Failed to delete demo",
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        assert_eq!(err.to_string(), "Failed to delete demo: access denied");
    }
}
