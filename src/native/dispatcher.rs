//! Request dispatch.
//!
//! The dispatcher turns one decoded frame into exactly one [`Response`].
//! Every [`ActionError`] is caught here and converted into a failure
//! response; nothing below the framing layer can end the host loop.

use std::error::Error as StdError;
use std::path::{Component, Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::demo::{self, DemoError};
use crate::error::{clip, ActionError, ActionResult, ConfigError, MAX_ECHO_CHARS};
use crate::native::codec::decode_payload;
use crate::native::protocol::{Action, Request, Response};
use crate::platform::{ClipboardWriter, FileSystem};
use crate::steam::{PathReport, PathResolver, ResolveError};

/// File extension of an installed demo.
const DEMO_EXTENSION: &str = "dem";

/// Routes requests to their handlers.
pub struct Dispatcher {
    resolver: PathResolver,
    clipboard: Box<dyn ClipboardWriter>,
    fs: Box<dyn FileSystem>,
}

impl Dispatcher {
    /// Creates a dispatcher with the given path resolver and OS capabilities.
    #[must_use]
    pub fn new(
        resolver: PathResolver,
        clipboard: Box<dyn ClipboardWriter>,
        fs: Box<dyn FileSystem>,
    ) -> Self {
        Self {
            resolver,
            clipboard,
            fs,
        }
    }

    /// Returns the path resolver.
    #[must_use]
    pub const fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Decodes a frame payload and handles it.
    pub fn handle_frame(&mut self, payload: &[u8]) -> Response {
        match decode_payload(payload).and_then(Request::from_object) {
            Ok(request) => self.handle(&request),
            Err(e) => {
                let response = Response::failure(&e);
                warn!(error = %response.message, kind = e.kind(), "Rejected message");
                response
            }
        }
    }

    /// Handles a decoded request.
    pub fn handle(&mut self, request: &Request) -> Response {
        info!(action = %request.action, "Action received");

        let result = match request.action {
            Action::Ping => Ok(Self::ping()),
            Action::GetCs2Path => Ok(self.get_cs2_path()),
            Action::SetCs2Path => self.set_cs2_path(request),
            Action::ProcessDemo => self.process_demo(request),
            Action::DeleteDemo => self.delete_demo(request),
        };

        match result {
            Ok(response) => response,
            Err(e) => {
                let response = Response::failure(&e);
                warn!(
                    action = %request.action,
                    kind = e.kind(),
                    error = %response.message,
                    cause = %source_chain(&e),
                    "Action failed"
                );
                response
            }
        }
    }

    fn ping() -> Response {
        debug!("Native host is alive");
        Response::success("pong")
    }

    fn get_cs2_path(&self) -> Response {
        let report = self.resolver.report();

        let response = match &report.effective {
            Some(effective) => Response::success("CS2 csgo folder found")
                .with("path", path_value(&effective.path))
                .with("source", json!(effective.source)),
            None => Response::failure(&ActionError::not_found(
                "CS2 csgo folder not found. Please configure the CS2 folder path manually.",
            ))
            .with("path", Value::Null),
        };

        with_report(response, &report)
    }

    fn set_cs2_path(&self, request: &Request) -> ActionResult<Response> {
        let path = request.required_str("path")?;

        let stored = self
            .resolver
            .save(Path::new(path))
            .map_err(|e| match e {
                ResolveError::InvalidPath { .. } | ResolveError::NotFound => {
                    ActionError::validation(e.to_string())
                }
                ResolveError::Store(e @ ConfigError::ValidationError { .. }) => {
                    ActionError::validation(format!(
                        "Existing configuration was not overwritten: {e}"
                    ))
                }
                ResolveError::Store(e) => {
                    ActionError::io("Failed to save configuration", std::io::Error::other(e))
                }
            })?;

        Ok(Response::success("Custom path set successfully").with("path", path_value(&stored)))
    }

    fn process_demo(&mut self, request: &Request) -> ActionResult<Response> {
        let source = PathBuf::from(request.required_str("filePath")?);
        let name = demo::installed_name(&source).map_err(|e| ActionError::validation(e.to_string()))?;

        if !source.is_file() {
            return Err(ActionError::file_not_found(source));
        }

        let csgo = self.install_dir()?;
        let dest = csgo.join(&name);
        info!(source = %source.display(), dest = %dest.display(), "Processing demo file");

        let decompressed = demo::decompress_into(&source, &csgo).map_err(demo_error)?;
        let size = decompressed.size();

        decompressed
            .install(self.fs.as_ref(), &dest)
            .map_err(|e| ActionError::io(format!("Failed to move demo to {}", dest.display()), e))?;
        info!(dest = %dest.display(), bytes = size, "Demo installed");

        self.fs.remove_file(&source).map_err(|e| {
            ActionError::io(
                format!(
                    "Demo installed as {name} but the download could not be deleted"
                ),
                e,
            )
        })?;
        debug!(source = %source.display(), "Deleted compressed download");

        let clipboard = self.copy_playdemo(&name);

        #[allow(clippy::cast_precision_loss)] // display only
        let size_mb = size as f64 / (1024.0 * 1024.0);

        Ok(Response::success(format!("Demo ready! ({size_mb:.1} MB)"))
            .with("filePath", path_value(&dest))
            .with("demoName", name)
            .with("csgoFolder", path_value(&csgo))
            .with("command", clipboard["command"].clone())
            .with("sizeBytes", size)
            .with("clipboard", clipboard))
    }

    fn delete_demo(&self, request: &Request) -> ActionResult<Response> {
        let name = request.required_str("demoName")?;

        if let Err(reason) = validate_demo_name(name) {
            let shown = clip(name, MAX_ECHO_CHARS);
            warn!(
                target: "security",
                demo_name = %shown,
                reason,
                "Rejected unsafe demo name"
            );
            return Err(ActionError::validation(format!(
                "Invalid demo name '{shown}': {reason}"
            )));
        }

        let csgo = self.install_dir()?;
        let path = csgo.join(name);

        if !path.is_file() {
            return Err(ActionError::file_not_found(path));
        }

        self.fs
            .remove_file(&path)
            .map_err(|e| ActionError::io(format!("Failed to delete demo {name}"), e))?;
        info!(path = %path.display(), "Deleted demo file");

        Ok(Response::success(format!("Demo file deleted: {name}")).with("demoName", name))
    }

    /// Resolves the installation directory for this request.
    fn install_dir(&self) -> ActionResult<PathBuf> {
        self.resolver
            .resolve_effective()
            .map(|resolved| {
                debug!(path = %resolved.path.display(), source = ?resolved.source, "Using CS2 csgo folder");
                resolved.path
            })
            .map_err(|e| {
                warn!(error = %e, "No installation directory");
                ActionError::PathResolution
            })
    }

    /// Puts the `playdemo` command on the clipboard and describes the outcome.
    fn copy_playdemo(&mut self, demo_name: &str) -> Value {
        let command = playdemo_command(demo_name);

        match self.clipboard.set_text(&command) {
            Ok(()) => {
                info!(command = %command, "Copied command to clipboard");
                json!({
                    "method": "clipboard",
                    "command": command,
                    "message": format!("Command copied to clipboard: {command}"),
                })
            }
            Err(e) => {
                warn!(error = %e, "Failed to copy to clipboard");
                json!({
                    "method": "manual",
                    "command": command,
                    "message": format!("Clipboard unavailable. Manual command: {command}"),
                })
            }
        }
    }
}

/// Builds the console command that plays `demo_name` from the content folder.
#[must_use]
pub fn playdemo_command(demo_name: &str) -> String {
    if demo_name.contains(char::is_whitespace) {
        format!("playdemo \"{demo_name}\"")
    } else {
        format!("playdemo {demo_name}")
    }
}

/// Checks that `name` names a demo file directly inside the content folder.
///
/// # Errors
///
/// Returns a short reason if the name could address anything else.
pub fn validate_demo_name(name: &str) -> Result<(), &'static str> {
    if name.contains(['/', '\\']) {
        return Err("contains a path separator");
    }
    if name.contains(':') {
        return Err("contains a drive or stream specifier");
    }
    if name.contains('\0') {
        return Err("contains a NUL byte");
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err("is not a plain file name"),
    }

    let is_demo = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(DEMO_EXTENSION));
    if !is_demo {
        return Err("is not a .dem file");
    }

    Ok(())
}

fn demo_error(e: DemoError) -> ActionError {
    match e {
        DemoError::NotCompressedDemo { .. } => ActionError::validation(e.to_string()),
        DemoError::Open { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
            ActionError::file_not_found(path)
        }
        DemoError::Open { path, source } => {
            ActionError::io(format!("Failed to open {}", path.display()), source)
        }
        DemoError::Decode { source } => {
            ActionError::decompression("corrupt or truncated zstd stream", Some(source))
        }
        DemoError::BadSignature => {
            ActionError::decompression("decompressed data is not a demo file", None)
        }
        DemoError::Write { source } => ActionError::io("Failed to write decompressed demo", source),
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

fn paths_value(paths: &[PathBuf]) -> Value {
    Value::Array(paths.iter().map(|p| path_value(p)).collect())
}

fn with_report(response: Response, report: &PathReport) -> Response {
    let configured = report.configured.as_ref();
    let effective = report.effective.as_ref().map(|e| path_value(&e.path));
    let executable = report.executable.as_deref().map(path_value);

    response
        .with("detected", paths_value(&report.detected))
        .with(
            "configuredPath",
            configured.map_or(Value::Null, |c| path_value(&c.path)),
        )
        .with("configuredPathValid", configured.is_some_and(|c| c.valid))
        .with("steamLibraries", paths_value(&report.libraries))
        .with("executablePath", executable.clone().unwrap_or(Value::Null))
        .with(
            "paths",
            json!({
                "steam_path": report.libraries.first().map(|p| path_value(p)),
                "cs2_csgo_path": effective,
                "cs2_exe_path": executable,
                "steam_libraries": paths_value(&report.libraries),
                "configured_path": configured.map(|c| path_value(&c.path)),
            }),
        )
}

/// Renders an error's source chain for the log. Causes whose text already
/// appears in the message above them are skipped.
fn source_chain(e: &dyn StdError) -> String {
    let mut chain = Vec::new();
    let mut shown = e.to_string();
    let mut current = e.source();
    while let Some(cause) = current {
        let text = cause.to_string();
        if !shown.contains(&text) {
            chain.push(text.clone());
        }
        shown = text;
        current = cause.source();
    }
    chain.join(": ")
}
