//! Readings, their sources and their stores
//!
//! The production loop pulls one [`Reading`] per tick from a [`DataSource`]
//! and persists it through a [`RecordStore`]; new connections are
//! bootstrapped from `query_recent`.

pub mod memory;
pub mod reading;
pub mod source;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use reading::Reading;
pub use source::{DataSource, SensorSource};
pub use sqlite::SqliteStore;
pub use store::RecordStore;
