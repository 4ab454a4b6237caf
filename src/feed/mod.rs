//! Feed composition
//!
//! ```text
//!   client connects ──► LiveFeed::connect
//!                         ├─ registry.admit()
//!                         ├─ producer.ensure_running()
//!                         └─ send snapshot (query_recent)
//!
//!   every interval  ──► producer tick
//!                         └─ source → store.save → multicaster.broadcast(update)
//!
//!   client leaves   ──► LiveFeed::disconnect / close ──► registry.evict()
//! ```

pub mod config;
pub mod hub;

pub use config::{
    interval_from_secs, FeedConfig, MAX_HISTORY_LIMIT, MAX_SNAPSHOT_SIZE, MIN_BROADCAST_INTERVAL,
};
pub use hub::LiveFeed;
