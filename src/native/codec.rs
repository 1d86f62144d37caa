//! Native Messaging framing.
//!
//! Every message on stdin and stdout is a frame:
//!
//! - a 4-byte little-endian unsigned payload length,
//! - followed by exactly that many bytes of UTF-8 JSON.
//!
//! The browser may deliver a frame across any number of reads, so both the
//! prefix and the payload are read in a loop until complete. A stream that
//! ends between frames is a clean disconnect; one that ends inside a frame
//! leaves the channel out of sync and is a [`FramingError`].

use std::io;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ActionError;

/// Size of the length prefix in bytes.
pub const PREFIX_LEN: usize = 4;

/// Largest frame the browser sends to a native host.
pub const MAX_INCOMING_LEN: u32 = 64 * 1024 * 1024;

/// Largest frame a native host may send to the browser.
pub const MAX_OUTGOING_LEN: usize = 1024 * 1024;

/// Stream-level faults. The channel cannot be trusted after any of these.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The stream ended inside a frame.
    #[error("stream closed mid-frame: expected {expected} bytes, got {received}")]
    Truncated {
        /// Bytes the frame required.
        expected: usize,
        /// Bytes available before the stream ended.
        received: usize,
    },

    /// The frame length exceeds the protocol limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Declared or actual length.
        len: usize,
        /// The applicable limit.
        max: usize,
    },

    /// Reading or writing the underlying stream failed.
    #[error("stream I/O failed")]
    Io(#[from] io::Error),
}

/// Reads into `buf` until it is full or the stream ends. Returns the number
/// of bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads one frame payload.
///
/// Returns `Ok(None)` if the stream is closed before the first prefix byte.
///
/// # Errors
///
/// Returns [`FramingError::Truncated`] if the stream ends inside the frame,
/// [`FramingError::TooLarge`] if the declared length exceeds
/// [`MAX_INCOMING_LEN`], or [`FramingError::Io`] on read failure.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; PREFIX_LEN];
    let received = read_full(reader, &mut prefix).await?;
    if received == 0 {
        return Ok(None);
    }
    if received < PREFIX_LEN {
        return Err(FramingError::Truncated {
            expected: PREFIX_LEN,
            received,
        });
    }

    let len = u32::from_le_bytes(prefix);
    if len > MAX_INCOMING_LEN {
        return Err(FramingError::TooLarge {
            len: len as usize,
            max: MAX_INCOMING_LEN as usize,
        });
    }

    let mut payload = vec![0u8; len as usize];
    let received = read_full(reader, &mut payload).await?;
    if received < payload.len() {
        return Err(FramingError::Truncated {
            expected: payload.len(),
            received,
        });
    }

    Ok(Some(payload))
}

/// Writes one frame and flushes.
///
/// # Errors
///
/// Returns [`FramingError::TooLarge`] (before writing anything) if the
/// payload exceeds [`MAX_OUTGOING_LEN`], or [`FramingError::Io`] on write
/// failure.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTGOING_LEN {
        return Err(FramingError::TooLarge {
            len: payload.len(),
            max: MAX_OUTGOING_LEN,
        });
    }

    let len = u32::try_from(payload.len()).map_err(|_| FramingError::TooLarge {
        len: payload.len(),
        max: MAX_OUTGOING_LEN,
    })?;

    let mut frame = Vec::with_capacity(PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(payload);

    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Decodes a frame payload into a JSON object.
///
/// # Errors
///
/// Returns [`ActionError::Protocol`] if the payload is empty, not UTF-8,
/// not JSON, or not a JSON object.
pub fn decode_payload(payload: &[u8]) -> Result<Map<String, Value>, ActionError> {
    if payload.is_empty() {
        return Err(ActionError::protocol("Empty message"));
    }

    let text = std::str::from_utf8(payload)
        .map_err(|e| ActionError::protocol(format!("Message is not valid UTF-8: {e}")))?;

    match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ActionError::protocol("Message must be a JSON object")),
        Err(e) => Err(ActionError::protocol(format!("Invalid JSON: {e}"))),
    }
}
