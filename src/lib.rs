//! Real-time fan-out of sensor readings over WebSocket
//!
//! Clients connect, receive a snapshot of recent history, then get every new
//! reading as it is produced. A singleton production loop starts with the
//! first client, ticks at a fixed interval, persists each reading and
//! multicasts it to every live client. A client whose send fails is dropped
//! without affecting anyone else.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use live_feed::data::{SensorSource, SqliteStore};
//! use live_feed::{FeedConfig, LiveFeed, LiveServer, ServerConfig};
//!
//! # async fn example() -> live_feed::Result<()> {
//! let store = Arc::new(SqliteStore::open("readings.db")?);
//! let feed = LiveFeed::new(FeedConfig::from_env()?, Arc::new(SensorSource::new()), store);
//!
//! let server = LiveServer::new(ServerConfig::from_env()?, Arc::new(feed));
//! server.run().await
//! # }
//! ```

pub mod broadcast;
pub mod data;
pub mod error;
pub mod feed;
pub mod producer;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast::{BroadcastReport, Message, Multicaster};
pub use error::{Error, Result};
pub use feed::{FeedConfig, LiveFeed};
pub use producer::{Producer, ProducerState};
pub use registry::{ClientHandle, ClientId, ConnectionRegistry, Frame};
pub use server::{LiveServer, ServerConfig};
pub use stats::{FeedStats, StatsSnapshot};
