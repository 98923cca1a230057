// SPDX-License-Identifier: Apache-2.0
//! The fixed handshake a subprocess plugin performs before the host will
//! dispense any capability from it.
//!
//! The host writes [`Hello`] first; the plugin must reply with
//! [`HelloAck`] carrying a matching `protocol_version` and a non-empty
//! `cookie`. Anything else, a version mismatch, an empty cookie, a closed
//! pipe, malformed JSON, is a fatal load error for that plugin.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::framing::{read_message, write_message, FramingError};
use crate::messages::{Hello, HelloAck, PROTOCOL_VERSION};

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("handshake transport error: {0}")]
    Transport(#[from] FramingError),
    #[error("protocol version mismatch: host speaks {host}, plugin speaks {plugin}")]
    VersionMismatch { host: u32, plugin: u32 },
    #[error("plugin sent an empty handshake cookie")]
    EmptyCookie,
}

/// Run the host side of the handshake over `stdin`/`stdout` of a freshly
/// spawned plugin process. Returns the plugin's cookie on success, purely
/// for diagnostic logging; the host does not interpret it further.
pub async fn perform_handshake<W, R>(stdin: &mut W, stdout: &mut R) -> Result<String, HandshakeError>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    write_message(
        stdin,
        &Hello {
            protocol_version: PROTOCOL_VERSION,
        },
    )
    .await?;

    let ack: HelloAck = read_message(stdout).await?;

    if ack.protocol_version != PROTOCOL_VERSION {
        return Err(HandshakeError::VersionMismatch {
            host: PROTOCOL_VERSION,
            plugin: ack.protocol_version,
        });
    }
    if ack.cookie.is_empty() {
        return Err(HandshakeError::EmptyCookie);
    }

    Ok(ack.cookie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepts_a_matching_handshake() {
        let mut to_plugin: Vec<u8> = Vec::new();
        let ack = HelloAck {
            protocol_version: PROTOCOL_VERSION,
            cookie: "plugin-cookie".to_owned(),
        };
        let mut from_plugin = Vec::new();
        write_message(&mut from_plugin, &ack).await.unwrap();
        let mut from_plugin = std::io::Cursor::new(from_plugin);

        let cookie = perform_handshake(&mut to_plugin, &mut from_plugin)
            .await
            .unwrap();
        assert_eq!(cookie, "plugin-cookie");
    }

    #[tokio::test]
    async fn rejects_a_version_mismatch() {
        let mut to_plugin: Vec<u8> = Vec::new();
        let ack = HelloAck {
            protocol_version: PROTOCOL_VERSION + 1,
            cookie: "x".to_owned(),
        };
        let mut from_plugin = Vec::new();
        write_message(&mut from_plugin, &ack).await.unwrap();
        let mut from_plugin = std::io::Cursor::new(from_plugin);

        let err = perform_handshake(&mut to_plugin, &mut from_plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::VersionMismatch { .. }));
    }

    #[tokio::test]
    async fn rejects_an_empty_cookie() {
        let mut to_plugin: Vec<u8> = Vec::new();
        let ack = HelloAck {
            protocol_version: PROTOCOL_VERSION,
            cookie: String::new(),
        };
        let mut from_plugin = Vec::new();
        write_message(&mut from_plugin, &ack).await.unwrap();
        let mut from_plugin = std::io::Cursor::new(from_plugin);

        let err = perform_handshake(&mut to_plugin, &mut from_plugin)
            .await
            .unwrap_err();
        assert!(matches!(err, HandshakeError::EmptyCookie));
    }
}
