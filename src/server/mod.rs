//! WebSocket server
//!
//! The transport side of the feed: accepts TCP connections, upgrades them
//! on the configured route and hands each client to the [`LiveFeed`].
//!
//! [`LiveFeed`]: crate::feed::LiveFeed

pub mod config;
pub mod connection;
pub mod listener;
pub mod socket;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::LiveServer;
pub use socket::WsClient;
