//! Error types
//!
//! A single error enum shared by the registry, producer, stores and the
//! WebSocket transport.

use tokio_tungstenite::tungstenite;

use crate::registry::ClientId;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for feed operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Message could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic storage failure (worker panics, corrupt rows)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The data source could not produce a reading
    #[error("Data source error: {0}")]
    Source(String),

    /// Write attempted on a client that already closed
    #[error("Client {0} is closed")]
    ClientClosed(ClientId),

    /// A write to a client did not finish in time
    #[error("Send to client {0} timed out")]
    SendTimeout(ClientId),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error means the peer simply went away.
    ///
    /// Disconnects are routine lifecycle events and lead to a plain
    /// eviction; everything else is treated as an internal failure.
    pub fn is_disconnect(&self) -> bool {
        match self {
            Error::Io(_) | Error::ClientClosed(_) | Error::SendTimeout(_) => true,
            Error::WebSocket(e) => matches!(
                e,
                tungstenite::Error::ConnectionClosed
                    | tungstenite::Error::AlreadyClosed
                    | tungstenite::Error::Io(_)
                    | tungstenite::Error::Protocol(
                        tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
                    )
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        assert!(Error::WebSocket(tungstenite::Error::ConnectionClosed).is_disconnect());
        assert!(Error::WebSocket(tungstenite::Error::AlreadyClosed).is_disconnect());
        assert!(Error::ClientClosed(ClientId::new(7)).is_disconnect());
        assert!(Error::SendTimeout(ClientId::new(7)).is_disconnect());
        assert!(Error::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)).is_disconnect());

        assert!(!Error::Storage("disk full".into()).is_disconnect());
        assert!(!Error::Source("sensor offline".into()).is_disconnect());
        assert!(!Error::WebSocket(tungstenite::Error::AttackAttempt).is_disconnect());
    }

    #[test]
    fn test_display() {
        let err = Error::ClientClosed(ClientId::new(3));
        assert_eq!(err.to_string(), "Client 3 is closed");

        let err = Error::Config("snapshot size must be within 1..=120".into());
        assert!(err.to_string().starts_with("Invalid configuration"));
    }
}
