// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus adapter that talks to an `xcd` gateway over its Unix socket

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use xc_adapters::{BusAdapter, BusError, BusMessage, ConnectOptions, Publication};

use crate::protocol::{
    self, ClientFrame, ProtocolError, ServerFrame, DEFAULT_TIMEOUT, PROTOCOL_VERSION,
};

/// An open gateway socket
struct Link {
    writer: OwnedWriteHalf,
    /// Replies to our requests, in order
    acks: mpsc::UnboundedReceiver<ServerFrame>,
    reader: JoinHandle<()>,
}

/// [`BusAdapter`] backed by a gateway socket
///
/// The inbound stream returned by `connect` ends when the gateway closes
/// the socket, which is how a lost broker session shows up here.
#[derive(Clone)]
pub struct GatewayBus {
    socket_path: PathBuf,
    link: Arc<Mutex<Option<Link>>>,
    timeout: Duration,
}

impl GatewayBus {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            link: Arc::new(Mutex::new(None)),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// How long each request waits for its acknowledgement
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one frame and wait for its acknowledgement
    ///
    /// A write failure, a closed socket or a missing ack drops the link,
    /// since a late ack would be taken as the reply to the next request.
    /// The inbound stream ends with it.
    async fn request(&self, frame: ClientFrame) -> Result<ServerFrame, BusError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(BusError::NotConnected)?;

        if let Err(e) = protocol::write_frame(&mut link.writer, &frame).await {
            if let Some(link) = guard.take() {
                link.reader.abort();
            }
            return Err(lost(e));
        }

        let error = match tokio::time::timeout(self.timeout, link.acks.recv()).await {
            Ok(Some(ServerFrame::Error { message })) => return Err(BusError::Broker(message)),
            Ok(Some(reply)) => return Ok(reply),
            Ok(None) => ProtocolError::ConnectionClosed,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "gateway ack timed out, dropping link");
                ProtocolError::Timeout
            }
        };
        if let Some(link) = guard.take() {
            link.reader.abort();
        }
        Err(lost(error))
    }
}

fn lost(error: ProtocolError) -> BusError {
    BusError::ConnectionLost(error.to_string())
}

/// Split gateway traffic into bus messages and acknowledgements
async fn read_loop(
    mut reader: OwnedReadHalf,
    inbox: mpsc::UnboundedSender<BusMessage>,
    acks: mpsc::UnboundedSender<ServerFrame>,
) {
    loop {
        let frame: ServerFrame = match protocol::read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => {
                tracing::debug!("gateway closed the connection");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "gateway read failed");
                return;
            }
        };

        match frame {
            ServerFrame::Message {
                topic,
                payload,
                retained,
            } => {
                // Receiver gone means nobody listens; keep acks flowing
                let _ = inbox.send(BusMessage {
                    topic,
                    payload,
                    retained,
                });
            }
            reply => {
                if acks.send(reply).is_err() {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl BusAdapter for GatewayBus {
    async fn connect(
        &self,
        options: ConnectOptions,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, BusError> {
        let mut guard = self.link.lock().await;
        if let Some(old) = guard.take() {
            old.reader.abort();
        }

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| BusError::Refused(format!("{}: {}", self.socket_path.display(), e)))?;
        let (reader, writer) = stream.into_split();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (acks_tx, acks_rx) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(reader, inbox_tx, acks_tx));
        *guard = Some(Link {
            writer,
            acks: acks_rx,
            reader,
        });
        drop(guard);

        let hello = self
            .request(ClientFrame::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
            .await?;
        if let ServerFrame::Hello { version } = hello {
            if version != PROTOCOL_VERSION {
                tracing::warn!(gateway = %version, "gateway protocol version differs");
            }
        }

        let reply = self
            .request(ClientFrame::Connect {
                client_id: options.client_id,
                last_will: options.last_will,
            })
            .await;
        match reply {
            Ok(_) => Ok(inbox_rx),
            Err(BusError::Broker(message)) => {
                self.link.lock().await.take();
                Err(BusError::Refused(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn subscribe(&self, filter: &str) -> Result<(), BusError> {
        self.request(ClientFrame::Subscribe {
            topic: filter.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn publish(&self, publication: Publication) -> Result<(), BusError> {
        self.request(ClientFrame::Publish { publication })
            .await
            .map(|_| ())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        let result = self.request(ClientFrame::Disconnect).await.map(|_| ());
        if let Some(link) = self.link.lock().await.take() {
            link.reader.abort();
        }
        result
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
