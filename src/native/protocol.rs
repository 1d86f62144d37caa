//! Request and response messages exchanged with the browser extension.
//!
//! # Requests
//!
//! A request is a JSON object with a string `action` and action-specific
//! fields:
//!
//! | action        | fields      |
//! |---------------|-------------|
//! | `ping`        |             |
//! | `getCS2Path`  |             |
//! | `setCS2Path`  | `path`      |
//! | `processDemo` | `filePath`  |
//! | `deleteDemo`  | `demoName`  |
//!
//! # Responses
//!
//! Every response carries `success`, `status` and `message`. Failures add an
//! `error` kind; successes add action-specific fields.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{clip, ActionError, ActionResult};

/// Longest `message` a failure response carries.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// The actions a request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Liveness check.
    Ping,
    /// Report the installation path.
    GetCs2Path,
    /// Override the installation path.
    SetCs2Path,
    /// Decompress a download and install it.
    ProcessDemo,
    /// Delete an installed demo.
    DeleteDemo,
}

impl Action {
    /// Every action, in wire order.
    pub const ALL: [Self; 5] = [
        Self::Ping,
        Self::GetCs2Path,
        Self::SetCs2Path,
        Self::ProcessDemo,
        Self::DeleteDemo,
    ];

    /// Returns the wire name of this action.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::GetCs2Path => "getCS2Path",
            Self::SetCs2Path => "setCS2Path",
            Self::ProcessDemo => "processDemo",
            Self::DeleteDemo => "deleteDemo",
        }
    }

    /// Looks up an action by its wire name. Matching is exact.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.name() == name)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The requested action.
    pub action: Action,
    fields: Map<String, Value>,
}

impl Request {
    /// Builds a request from a decoded JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Protocol`] if `action` is missing or not a
    /// string, and [`ActionError::UnknownAction`] if it names no action.
    pub fn from_object(fields: Map<String, Value>) -> ActionResult<Self> {
        let name = match fields.get("action") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(ActionError::protocol("Field 'action' must be a string")),
            None => return Err(ActionError::protocol("Missing required field: action")),
        };

        let action = Action::from_name(name).ok_or_else(|| ActionError::unknown_action(name))?;

        Ok(Self { action, fields })
    }

    /// Returns a required, non-empty string field.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::Validation`] if the field is missing, not a
    /// string, or empty.
    pub fn required_str(&self, field: &str) -> ActionResult<&str> {
        match self.fields.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
            Some(Value::String(_)) => Err(ActionError::validation(format!(
                "Field '{field}' must not be empty"
            ))),
            Some(_) => Err(ActionError::validation(format!(
                "Field '{field}' must be a string"
            ))),
            None => Err(ActionError::validation(format!(
                "Missing required field: {field}"
            ))),
        }
    }
}

/// Response status values understood by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The action completed.
    Success,
    /// The action failed.
    Error,
    /// The action name was not recognised.
    UnknownAction,
}

/// A response frame body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Whether the action completed.
    pub success: bool,
    /// Status string kept for older extension builds.
    pub status: Status,
    /// Human-readable outcome.
    pub message: String,
    /// Error kind, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    /// Action-specific payload.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    /// Creates a successful response with an empty payload.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            status: Status::Success,
            message: message.into(),
            error: None,
            payload: Map::new(),
        }
    }

    /// Creates a failure response from an action error.
    #[must_use]
    pub fn failure(error: &ActionError) -> Self {
        let status = match error {
            ActionError::UnknownAction { .. } => Status::UnknownAction,
            _ => Status::Error,
        };
        Self {
            success: false,
            status,
            message: clip(&error.to_string(), MAX_MESSAGE_CHARS).into_owned(),
            error: Some(error.kind()),
            payload: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Serialises the response to frame payload bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
