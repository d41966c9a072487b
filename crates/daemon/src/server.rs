// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker gateway: exposes a [`MemoryBroker`] over a Unix socket.
//!
//! Each socket carries at most one bus session. A socket that closes
//! without a `Disconnect` frame counts as an unclean drop, so the broker
//! publishes the session's last will.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use xc_adapters::{ConnectOptions, MemoryBroker, SessionId};

use crate::protocol::{self, ClientFrame, ProtocolError, ServerFrame, PROTOCOL_VERSION};

/// Pause after a failed accept, e.g. on EMFILE
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Outbound traffic for one socket
enum Outbound {
    Frame(ServerFrame),
    /// The bus session ended; close our side of the socket
    Close,
}

/// Accept gateway connections forever
pub async fn serve(listener: UnixListener, broker: MemoryBroker) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let broker = broker.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(broker, stream).await {
                        warn!("gateway connection ended with error: {}", e);
                    }
                });
            }
            Err(e) => accept_failed(&e).await,
        }
    }
}

async fn accept_failed(e: &std::io::Error) {
    error!("Error accepting connection: {}", e);
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

/// Serve one client socket
pub async fn handle_connection(
    broker: MemoryBroker,
    stream: UnixStream,
) -> Result<(), ProtocolError> {
    let (mut reader, writer) = stream.into_split();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_loop(writer, out_rx));

    let mut connection = Connection {
        broker,
        session: None,
        forwarder: None,
        out: out_tx,
    };

    let result = loop {
        let frame: ClientFrame = match protocol::read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(ProtocolError::ConnectionClosed) => break Ok(()),
            Err(e) => break Err(e),
        };
        debug!("gateway frame: {:?}", frame);

        if connection.handle(frame) {
            break Ok(());
        }
    };

    // Anything still open here was not closed by a Disconnect frame
    if let Some(session) = connection.session.take() {
        info!(?session, "gateway client dropped, publishing last will");
        connection.broker.abort(session);
    }
    drop(connection);
    let _ = writer_task.await;
    result
}

struct Connection {
    broker: MemoryBroker,
    session: Option<SessionId>,
    forwarder: Option<JoinHandle<()>>,
    out: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    /// Apply one frame; returns true when the socket should close
    fn handle(&mut self, frame: ClientFrame) -> bool {
        let reply = match frame {
            ClientFrame::Hello { version } => {
                if version != PROTOCOL_VERSION {
                    warn!(client = %version, server = PROTOCOL_VERSION, "protocol version mismatch");
                }
                ServerFrame::Hello {
                    version: PROTOCOL_VERSION.to_string(),
                }
            }

            ClientFrame::Ping => ServerFrame::Pong,

            ClientFrame::Connect {
                client_id,
                last_will,
            } => {
                // The old forwarder must not close the socket on its way out
                if let Some(forwarder) = self.forwarder.take() {
                    forwarder.abort();
                }
                if let Some(previous) = self.session.take() {
                    self.broker.close(previous);
                }
                let options = ConnectOptions {
                    client_id,
                    last_will,
                };
                match self.broker.open(options) {
                    Ok((session, mut inbox)) => {
                        self.session = Some(session);
                        let out = self.out.clone();
                        self.forwarder = Some(tokio::spawn(async move {
                            while let Some(message) = inbox.recv().await {
                                if out.send(Outbound::Frame(message.into())).is_err() {
                                    return;
                                }
                            }
                            let _ = out.send(Outbound::Close);
                        }));
                        ServerFrame::Ok
                    }
                    Err(e) => error_frame(e),
                }
            }

            ClientFrame::Subscribe { topic } => match self.session {
                Some(session) => ack(self.broker.subscribe(session, &topic)),
                None => not_connected(),
            },

            ClientFrame::Publish { publication } => match self.session {
                Some(session) => ack(self.broker.publish(session, &publication)),
                None => not_connected(),
            },

            ClientFrame::Disconnect => {
                let Some(session) = self.session.take() else {
                    self.send(not_connected());
                    return false;
                };
                self.broker.close(session);
                self.send(ServerFrame::Ok);
                return true;
            }
        };

        self.send(reply);
        false
    }

    fn send(&self, frame: ServerFrame) {
        let _ = self.out.send(Outbound::Frame(frame));
    }
}

fn ack(result: Result<(), xc_adapters::BusError>) -> ServerFrame {
    match result {
        Ok(()) => ServerFrame::Ok,
        Err(e) => error_frame(e),
    }
}

fn error_frame(error: impl std::fmt::Display) -> ServerFrame {
    ServerFrame::Error {
        message: error.to_string(),
    }
}

fn not_connected() -> ServerFrame {
    error_frame(xc_adapters::BusError::NotConnected)
}

async fn write_loop(mut writer: OwnedWriteHalf, mut out: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(outbound) = out.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = protocol::write_frame(&mut writer, &frame).await {
                    debug!("gateway write failed: {}", e);
                    return;
                }
            }
            Outbound::Close => break,
        }
    }
    let _ = writer.shutdown().await;
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
