//! The native host loop.

use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};
use tracing::{debug, error, info, warn};

use crate::error::ActionError;
use crate::native::codec::{read_frame, write_frame, FramingError};
use crate::native::dispatcher::Dispatcher;
use crate::native::protocol::Response;

/// Host lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    /// Reading and answering frames.
    Running,
    /// The stream ended, failed, or a shutdown signal arrived.
    Closed,
}

/// Reads request frames, dispatches them and writes one response frame each.
pub struct NativeHost<R, W> {
    state: HostState,
    reader: R,
    writer: W,
    dispatcher: Dispatcher,
}

impl NativeHost<Stdin, Stdout> {
    /// Creates a host on the process's stdin and stdout.
    #[must_use]
    pub fn stdio(dispatcher: Dispatcher) -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout(), dispatcher)
    }
}

impl<R, W> NativeHost<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a host over the given streams.
    #[must_use]
    pub const fn new(reader: R, writer: W, dispatcher: Dispatcher) -> Self {
        Self {
            state: HostState::Running,
            reader,
            writer,
            dispatcher,
        }
    }

    /// Returns the current host state.
    #[must_use]
    pub const fn state(&self) -> HostState {
        self.state
    }

    /// Consumes the host and returns its output stream.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Serves frames until the input stream closes.
    ///
    /// # Errors
    ///
    /// Returns the [`FramingError`] that ended the loop, if any.
    pub async fn run(&mut self) -> Result<(), FramingError> {
        loop {
            let frame = read_frame(&mut self.reader).await;
            if self.handle_read_result(frame).await? {
                return Ok(());
            }
        }
    }

    /// Serves frames until the input stream closes or a shutdown signal
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns the [`FramingError`] that ended the loop, if any.
    #[cfg(unix)]
    pub async fn run_until_shutdown(&mut self) -> Result<(), FramingError> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down");
                    self.state = HostState::Closed;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                    self.state = HostState::Closed;
                    return Ok(());
                }

                frame = read_frame(&mut self.reader) => {
                    if self.handle_read_result(frame).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves frames until the input stream closes or a shutdown signal
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns the [`FramingError`] that ended the loop, if any.
    #[cfg(windows)]
    pub async fn run_until_shutdown(&mut self) -> Result<(), FramingError> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down");
                    self.state = HostState::Closed;
                    return Ok(());
                }

                frame = read_frame(&mut self.reader) => {
                    if self.handle_read_result(frame).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result of one frame read.
    ///
    /// Returns `true` if the host should stop.
    async fn handle_read_result(
        &mut self,
        frame: Result<Option<Vec<u8>>, FramingError>,
    ) -> Result<bool, FramingError> {
        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!("Input stream closed");
                self.state = HostState::Closed;
                return Ok(true);
            }
            Err(e) => {
                error!(error = %e, "Failed to read frame");
                self.state = HostState::Closed;
                return Err(e);
            }
        };

        debug!(len = payload.len(), "Received frame");
        let response = self.dispatcher.handle_frame(&payload);

        if let Err(e) = self.write_response(&response).await {
            error!(error = %e, "Failed to send response");
            self.state = HostState::Closed;
            return Err(e);
        }

        Ok(false)
    }

    /// Writes one response frame. A response over the outgoing limit is
    /// replaced by a short failure response so the request is still answered.
    async fn write_response(&mut self, response: &Response) -> Result<(), FramingError> {
        let bytes = response.to_bytes()?;
        match write_frame(&mut self.writer, &bytes).await {
            Err(FramingError::TooLarge { len, max }) => {
                warn!(len, max, "Response too large, sending failure instead");
                let fallback = Response::failure(&ActionError::protocol(format!(
                    "Response of {len} bytes exceeds the {max} byte limit"
                )));
                write_frame(&mut self.writer, &fallback.to_bytes()?).await
            }
            other => other,
        }
    }
}
