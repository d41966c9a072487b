// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway wire protocol
//!
//! Every frame is a 4-byte big-endian length followed by a JSON document.
//! Clients send [`ClientFrame`]s and receive [`ServerFrame`]s; bus messages
//! for a connected session arrive as unsolicited `Message` frames.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use xc_adapters::{BusMessage, Publication};

/// Protocol version exchanged in `Hello`
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timeout for a single request/acknowledgement exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Frames larger than this are rejected
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Frames sent by a gateway client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    Hello {
        version: String,
    },
    /// Open a bus session; replaces any session on this socket
    Connect {
        client_id: String,
        #[serde(default)]
        last_will: Option<Publication>,
    },
    Subscribe {
        topic: String,
    },
    Publish {
        publication: Publication,
    },
    /// Close the session cleanly, discarding the last will
    Disconnect,
    Ping,
}

/// Frames sent by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    Hello {
        version: String,
    },
    Ok,
    Pong,
    /// A bus message delivered to the session
    Message {
        topic: String,
        payload: Vec<u8>,
        #[serde(default)]
        retained: bool,
    },
    Error {
        message: String,
    },
}

impl From<BusMessage> for ServerFrame {
    fn from(message: BusMessage) -> Self {
        ServerFrame::Message {
            topic: message.topic,
            payload: message.payload,
            retained: message.retained,
        }
    }
}

/// Errors on the gateway socket
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed")]
    ConnectionClosed,

    #[error("timeout")]
    Timeout,
}

/// Serialize a frame to JSON (no length prefix)
pub fn encode<T: Serialize>(frame: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(frame)?)
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(data)?)
}

/// Write one length-prefixed message
pub async fn write_message<W>(writer: &mut W, data: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: data.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    let len = data.len() as u32;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message
///
/// A clean end of stream before the length prefix is `ConnectionClosed`.
pub async fn read_message<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer).await?;
    Ok(buffer)
}

pub async fn write_frame<W, T>(writer: &mut W, frame: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let data = encode(frame)?;
    write_message(writer, &data).await
}

pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let data = read_message(reader).await?;
    decode(&data)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
