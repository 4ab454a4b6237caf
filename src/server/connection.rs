//! Per-connection handler
//!
//! Admits the client through the feed, then reads from the socket only to
//! find out when the client goes away.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use crate::error::Error;
use crate::feed::LiveFeed;
use crate::registry::{ClientHandle, ClientId, CLOSE_INTERNAL_ERROR};
use crate::session::SessionState;

use super::socket::WsClient;

type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// Result of one read from the client
#[derive(Debug)]
pub(crate) enum Inbound {
    /// Any data or control frame; contents are ignored
    Frame,
    /// The client closed or the connection dropped
    Disconnected,
    /// Something other than a disconnect went wrong
    Failed(Error),
}

/// Read the next inbound frame and classify it
pub(crate) async fn next_inbound(stream: &mut WsStream) -> Inbound {
    classify(stream.next().await)
}

fn classify(
    frame: Option<std::result::Result<WsMessage, tokio_tungstenite::tungstenite::Error>>,
) -> Inbound {
    match frame {
        None | Some(Ok(WsMessage::Close(_))) => Inbound::Disconnected,
        Some(Ok(_)) => Inbound::Frame,
        Some(Err(e)) => {
            let err = Error::from(e);
            if err.is_disconnect() {
                Inbound::Disconnected
            } else {
                Inbound::Failed(err)
            }
        }
    }
}

/// One accepted WebSocket connection
pub struct Connection {
    session: SessionState,
    feed: Arc<LiveFeed>,
    client: Arc<WsClient>,
    stream: WsStream,
}

impl Connection {
    /// Split the socket and prepare the session
    pub fn new(
        session_id: u64,
        peer_addr: SocketAddr,
        ws: WebSocketStream<TcpStream>,
        feed: Arc<LiveFeed>,
        send_timeout: Duration,
    ) -> Self {
        let (sink, stream) = ws.split();
        let mut session = SessionState::new(session_id, peer_addr);
        session.start_bootstrap();

        Self {
            session,
            feed,
            client: Arc::new(WsClient::new(
                ClientId::new(session_id),
                peer_addr,
                sink,
                send_timeout,
            )),
            stream,
        }
    }

    /// Serve the connection until the client leaves
    pub async fn run(mut self) {
        let id = self.client.id();
        let handle: Arc<dyn ClientHandle> = self.client.clone();

        match self.feed.connect(Arc::clone(&handle)).await {
            Ok(_) => self.session.go_live(),
            Err(e) if e.is_disconnect() => {
                tracing::debug!(client = %id, error = %e, "Client left during bootstrap");
                self.feed.disconnect(id).await;
                self.session.finish();
                return;
            }
            Err(e) => {
                tracing::error!(client = %id, error = %e, "Failed to bootstrap client");
                self.fail().await;
                return;
            }
        }

        loop {
            tokio::select! {
                _ = self.client.closed() => {
                    // A broadcast failed on this client and already evicted it
                    tracing::debug!(client = %id, "Client write side closed");
                    self.feed.disconnect(id).await;
                    break;
                }
                inbound = next_inbound(&mut self.stream) => match inbound {
                    Inbound::Frame => self.session.on_frame(),
                    Inbound::Disconnected => {
                        self.feed.disconnect(id).await;
                        break;
                    }
                    Inbound::Failed(e) => {
                        tracing::error!(client = %id, error = %e, "WebSocket error");
                        self.fail().await;
                        return;
                    }
                },
            }
        }

        let was_live = self.session.is_live();
        self.session.finish();
        tracing::debug!(
            session_id = self.session.id,
            peer = %self.session.peer_addr,
            was_live = was_live,
            live_ms = self.session.live_duration().map(|d| d.as_millis() as u64),
            duration_ms = self.session.duration().as_millis() as u64,
            frames_received = self.session.frames_received,
            "Session ended"
        );
    }

    /// Force-close with an internal error code and evict
    async fn fail(&mut self) {
        self.session.close();
        self.feed
            .close(self.client.as_ref(), CLOSE_INTERNAL_ERROR, "Internal error")
            .await;
        self.session.finish();
    }
}
