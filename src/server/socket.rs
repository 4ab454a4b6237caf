//! WebSocket-backed client handle

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::registry::{ClientHandle, ClientId, Frame};

type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;

/// Write half of a client's WebSocket
///
/// Frames go out as text. The sink sits behind an async mutex, so frames for
/// one client are written in the order `send` was called. A write that
/// does not finish within `send_timeout` fails with
/// [`Error::SendTimeout`]. Once a write fails or the client is closed,
/// `closed()` resolves and further sends are rejected.
pub struct WsClient {
    id: ClientId,
    peer_addr: SocketAddr,
    sink: Mutex<WsSink>,
    send_timeout: Duration,
    shutdown: CancellationToken,
}

impl WsClient {
    pub(crate) fn new(
        id: ClientId,
        peer_addr: SocketAddr,
        sink: WsSink,
        send_timeout: Duration,
    ) -> Self {
        Self {
            id,
            peer_addr,
            sink: Mutex::new(sink),
            send_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    /// Remote peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the connection is known to be unusable
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once a write failed or the client was closed
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}

#[async_trait]
impl ClientHandle for WsClient {
    fn id(&self) -> ClientId {
        self.id
    }

    async fn send(&self, frame: Frame) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ClientClosed(self.id));
        }

        let write = async {
            let mut sink = self.sink.lock().await;
            sink.send(WsMessage::text(frame.as_str().to_owned())).await
        };

        match tokio::time::timeout(self.send_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.shutdown.cancel();
                Err(e.into())
            }
            Err(_) => {
                self.shutdown.cancel();
                tracing::warn!(
                    client = %self.id,
                    peer = %self.peer_addr,
                    timeout_ms = self.send_timeout.as_millis() as u64,
                    "Send timed out; dropping slow client"
                );
                Err(Error::SendTimeout(self.id))
            }
        }
    }

    async fn close(&self, code: u16, reason: &str) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.shutdown.cancel();

        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        let write = async {
            let mut sink = self.sink.lock().await;
            sink.send(WsMessage::Close(Some(frame))).await?;
            sink.close().await
        };
        tokio::time::timeout(self.send_timeout, write)
            .await
            .map_err(|_| Error::SendTimeout(self.id))??;

        tracing::debug!(client = %self.id, peer = %self.peer_addr, code = code, "Client closed");
        Ok(())
    }
}
