//! Client handle abstraction
//!
//! The registry never owns a connection. It holds a shared reference to
//! something that can deliver a [`Frame`] and close itself, identified by a
//! [`ClientId`].

use async_trait::async_trait;

use crate::error::Result;

use super::frame::Frame;

/// Normal closure
pub const CLOSE_NORMAL: u16 = 1000;
/// Endpoint is going away (server shutdown)
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Unexpected condition on the server side
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Identity of one live connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// Create a client id from a session id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric id
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live client as seen by the registry and the multicaster
///
/// Implementations are provided by the transport. `send` must preserve call
/// order for a single client; concurrent calls on different clients are
/// independent.
#[async_trait]
pub trait ClientHandle: Send + Sync {
    /// Identity used for set membership
    fn id(&self) -> ClientId;

    /// Deliver one frame, failing if the connection is unusable
    async fn send(&self, frame: Frame) -> Result<()>;

    /// Close the connection with a WebSocket close code and reason
    async fn close(&self, code: u16, reason: &str) -> Result<()>;
}
