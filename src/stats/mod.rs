//! Feed statistics

pub mod metrics;

pub use metrics::{FeedStats, StatsSnapshot};
