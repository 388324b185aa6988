//! Transport abstraction and the WebSocket implementation.
//!
//! The probe and session code talk to transports through the
//! [`TransportDialer`] / [`TransportSink`] / [`TransportStream`] traits, so a
//! different transport strategy (or a mock in tests) can be swapped in
//! without touching the session logic. [`WsDialer`] is the production
//! implementation on top of tokio-tungstenite.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::Result;
use crate::feed::candidate::{AuthMode, TransportCandidate};

/// Write half of an active transport.
#[async_trait]
pub trait TransportSink: Send {
    /// Send one text frame.
    async fn send_text(&mut self, text: String) -> Result<()>;
    /// Close the transport gracefully.
    async fn close(&mut self) -> Result<()>;
}

/// Read half of an active transport.
#[async_trait]
pub trait TransportStream: Send {
    /// Receive the next inbound JSON message.
    ///
    /// Returns `None` when the transport has closed. Frames that are not
    /// JSON (socket.io handshake noise, pings) are consumed internally and
    /// never surface here.
    async fn next_message(&mut self) -> Option<Result<Value>>;
}

/// Opens transports for candidates. The seam the probe (and tests) inject.
#[async_trait]
pub trait TransportDialer: Send + Sync {
    /// Attempt to open the given candidate, authenticating with `token`
    /// according to the candidate's [`AuthMode`].
    async fn dial(
        &self,
        candidate: &TransportCandidate,
        token: Option<&str>,
    ) -> Result<ActiveTransport>;
}

/// A successfully opened transport: the winning candidate's name plus split
/// read/write halves.
pub struct ActiveTransport {
    /// Name of the candidate that won the probe.
    pub candidate_name: String,
    /// Write half.
    pub sink: Box<dyn TransportSink>,
    /// Read half.
    pub stream: Box<dyn TransportStream>,
}

impl std::fmt::Debug for ActiveTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveTransport")
            .field("candidate_name", &self.candidate_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// WebSocket implementation
// ---------------------------------------------------------------------------

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production dialer speaking WebSocket via tokio-tungstenite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsDialer;

#[async_trait]
impl TransportDialer for WsDialer {
    async fn dial(
        &self,
        candidate: &TransportCandidate,
        token: Option<&str>,
    ) -> Result<ActiveTransport> {
        let mut url = candidate.url.clone();
        if candidate.auth == AuthMode::Query {
            if let Some(token) = token {
                url.query_pairs_mut().append_pair("token", token);
            }
        }

        let (ws, _resp) = connect_async(url.as_str()).await?;
        let (mut write, read) = ws.split();

        if candidate.auth == AuthMode::Payload {
            if let Some(token) = token {
                let auth = json!({ "type": "auth", "token": token });
                write.send(Message::Text(auth.to_string().into())).await?;
            }
        }

        tracing::info!(candidate = %candidate.name, "transport opened");

        Ok(ActiveTransport {
            candidate_name: candidate.name.clone(),
            sink: Box::new(WsSink { write }),
            stream: Box::new(WsReadStream { read }),
        })
    }
}

struct WsSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send_text(&mut self, text: String) -> Result<()> {
        self.write.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}

struct WsReadStream {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for WsReadStream {
    async fn next_message(&mut self) -> Option<Result<Value>> {
        loop {
            match self.read.next().await? {
                Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => return Some(Ok(value)),
                    Err(_) => {
                        // Socket.io handshake frames and other non-JSON text.
                        tracing::debug!("skipping non-JSON text frame: {text}");
                        continue;
                    }
                },
                Ok(Message::Binary(data)) => match serde_json::from_slice::<Value>(&data) {
                    Ok(value) => return Some(Ok(value)),
                    Err(_) => {
                        tracing::debug!("skipping non-JSON binary frame ({} bytes)", data.len());
                        continue;
                    }
                },
                // Ping/pong handled automatically by tungstenite.
                Ok(Message::Ping(_) | Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => {
                    tracing::info!("transport closed by server");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}
