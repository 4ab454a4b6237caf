//! Live feed server listener
//!
//! Handles TCP accept loop, WebSocket handshake and spawns connection
//! handlers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

use crate::error::{Error, Result};
use crate::feed::LiveFeed;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// Pause after a failed accept
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// WebSocket server in front of a [`LiveFeed`]
pub struct LiveServer {
    config: ServerConfig,
    feed: Arc<LiveFeed>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl LiveServer {
    /// Create a new server with the given configuration and feed
    pub fn new(config: ServerConfig, feed: Arc<LiveFeed>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            feed,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the feed
    pub fn feed(&self) -> &Arc<LiveFeed> {
        &self.feed
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown the production loop is stopped; connected clients are
    /// dropped without flushing.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        tracing::info!(
            addr = %listener.local_addr()?,
            route = %self.config.ws_route,
            "Live feed server listening"
        );

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        self.feed.shutdown().await;

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    // Back off so a persistent failure (e.g. EMFILE) does not spin
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let route = self.config.ws_route.clone();
        let timeout = self.config.handshake_timeout;
        let send_timeout = self.config.send_timeout;
        let feed = Arc::clone(&self.feed);

        tokio::spawn(async move {
            let _permit = permit;

            let ws = match accept_websocket(socket, route, timeout).await {
                Ok(ws) => ws,
                Err(e) => {
                    tracing::warn!(session_id = session_id, peer = %peer_addr, error = %e, "WebSocket handshake failed");
                    return;
                }
            };

            Connection::new(session_id, peer_addr, ws, feed, send_timeout)
                .run()
                .await;

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}

/// Complete the WebSocket handshake, accepting only `route`
async fn accept_websocket(
    socket: TcpStream,
    route: String,
    timeout: Duration,
) -> Result<WebSocketStream<TcpStream>> {
    let check_route = move |request: &Request, response: Response| {
        if request.uri().path() == route {
            Ok(response)
        } else {
            let mut rejection: ErrorResponse =
                ErrorResponse::new(Some(format!("no WebSocket endpoint at {}", request.uri().path())));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    match tokio::time::timeout(timeout, accept_hdr_async(socket, check_route)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "WebSocket handshake timed out",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
    use tokio_tungstenite::{connect_async, MaybeTlsStream};

    use super::*;
    use crate::broadcast::Message;
    use crate::data::SensorSource;
    use crate::feed::FeedConfig;
    use crate::producer::ProducerState;

    type TestSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct TestServer {
        addr: SocketAddr,
        feed: Arc<LiveFeed>,
        stop: oneshot::Sender<()>,
        task: tokio::task::JoinHandle<Result<()>>,
    }

    async fn start(config: ServerConfig) -> TestServer {
        let feed_config = FeedConfig::default().broadcast_interval(Duration::from_millis(50));
        let feed = Arc::new(LiveFeed::with_memory_store(
            feed_config,
            Arc::new(SensorSource::new()),
        ));
        let server = LiveServer::new(config, Arc::clone(&feed));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            server
                .serve(listener, async {
                    let _ = stopped.await;
                })
                .await
        });

        TestServer {
            addr,
            feed,
            stop,
            task,
        }
    }

    async fn next_message(ws: &mut TestSocket) -> Message {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .expect("WebSocket error");
            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn wait_for_clients(feed: &LiveFeed, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while feed.active_clients() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("registry did not settle");
    }

    #[tokio::test]
    async fn test_snapshot_then_updates() {
        let server = start(ServerConfig::default()).await;

        let (mut ws, _) = connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();

        assert!(matches!(next_message(&mut ws).await, Message::Snapshot(_)));
        let first = match next_message(&mut ws).await {
            Message::Update(reading) => reading,
            other => panic!("expected update, got {:?}", other),
        };
        let second = match next_message(&mut ws).await {
            Message::Update(reading) => reading,
            other => panic!("expected update, got {:?}", other),
        };
        assert!(first.id < second.id);
        assert_eq!(server.feed.active_clients(), 1);

        // Late joiner is bootstrapped with the history so far
        let (mut late, _) = connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        // An update may race ahead of the snapshot; the snapshot still comes
        let history = loop {
            if let Message::Snapshot(readings) = next_message(&mut late).await {
                break readings;
            }
        };
        assert!(history.len() >= 2);
        wait_for_clients(&server.feed, 2).await;

        ws.close(None).await.unwrap();
        wait_for_clients(&server.feed, 1).await;

        late.send(WsMessage::text("hello".to_string())).await.unwrap();
        assert!(matches!(next_message(&mut late).await, Message::Update(_)));

        server.stop.send(()).unwrap();
        server.task.await.unwrap().unwrap();
        assert_eq!(server.feed.producer_state(), ProducerState::Stopped);
    }

    #[tokio::test]
    async fn test_abrupt_disconnect_evicts() {
        let server = start(ServerConfig::default()).await;

        let (mut ws, _) = connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        next_message(&mut ws).await;
        wait_for_clients(&server.feed, 1).await;

        drop(ws);
        wait_for_clients(&server.feed, 0).await;

        server.stop.send(()).unwrap();
        server.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_unknown_route_rejected() {
        let server = start(ServerConfig::default().ws_route("/feed")).await;

        match connect_async(format!("ws://{}/ws", server.addr)).await {
            Err(tungstenite::Error::Http(response)) => {
                assert_eq!(response.status(), StatusCode::NOT_FOUND);
            }
            other => panic!("expected 404, got {:?}", other.map(|(_, r)| r.status())),
        }
        assert_eq!(server.feed.active_clients(), 0);
        assert_eq!(server.feed.producer_state(), ProducerState::NotStarted);

        let (mut ws, _) = connect_async(format!("ws://{}/feed", server.addr))
            .await
            .unwrap();
        assert!(matches!(next_message(&mut ws).await, Message::Snapshot(_)));

        server.stop.send(()).unwrap();
        server.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let server = start(ServerConfig::default().max_connections(1)).await;

        let (mut first, _) = connect_async(format!("ws://{}/ws", server.addr))
            .await
            .unwrap();
        next_message(&mut first).await;

        // Second socket is dropped before the handshake completes
        assert!(connect_async(format!("ws://{}/ws", server.addr)).await.is_err());
        assert_eq!(server.feed.active_clients(), 1);

        server.stop.send(()).unwrap();
        server.task.await.unwrap().unwrap();
    }

    #[test]
    fn test_accept_backoff_is_bounded() {
        assert!(ACCEPT_BACKOFF > Duration::ZERO);
        assert!(ACCEPT_BACKOFF <= Duration::from_secs(1));
    }
}
