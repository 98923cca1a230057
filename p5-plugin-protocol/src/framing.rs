// SPDX-License-Identifier: Apache-2.0
//! Length-prefixed JSON framing over a subprocess's stdio pipes.
//!
//! Only the message shapes in [`crate::messages`] are fixed; the framing
//! underneath them is this module's own choice: a 4-byte little-endian
//! length prefix followed by that many bytes of UTF-8 JSON. A single
//! oversized message is rejected rather than silently truncated, unlike
//! Hipcheck's gRPC transport. The plugins this host talks to never need
//! mid-message chunking, since credential/config payloads are small
//! key-value maps rather than streamed analysis output.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reject any single frame larger than this. Generous for env/config maps,
/// small enough to guard against a misbehaving plugin wedging the host.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FramingError {
    #[error("frame of {0} bytes exceeds max frame size of {MAX_FRAME_BYTES}")]
    FrameTooLarge(u32),
    #[error("plugin closed the connection")]
    Closed,
    #[error("io error communicating with plugin: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message from plugin: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FramingError>;

/// Serialize `msg` and write it as one length-prefixed frame.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    let len: u32 = body
        .len()
        .try_into()
        .map_err(|_| FramingError::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_BYTES {
        return Err(FramingError::FrameTooLarge(len));
    }
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame and deserialize it as `T`.
///
/// Returns `Err(FramingError::Closed)` if the stream ends before a length
/// prefix can be read at all (a clean EOF between messages); any other
/// truncation is an `Io` error.
pub async fn read_message<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FramingError::Closed)
        }
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(FramingError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(serde_json::from_slice(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Hello, PROTOCOL_VERSION};

    #[tokio::test]
    async fn round_trips_a_message() {
        let mut buf: Vec<u8> = Vec::new();
        let hello = Hello {
            protocol_version: PROTOCOL_VERSION,
        };
        write_message(&mut buf, &hello).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let decoded: Hello = read_message(&mut cursor).await.unwrap();
        assert_eq!(decoded.protocol_version, PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn reports_closed_on_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        let err = read_message::<_, Hello>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FramingError::Closed));
    }

    #[tokio::test]
    async fn rejects_oversized_frames() {
        let mut buf: Vec<u8> = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_BYTES + 1).to_le_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_message::<_, Hello>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FramingError::FrameTooLarge(_)));
    }
}
