//! Feed configuration

use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound for the bootstrap snapshot
pub const MAX_SNAPSHOT_SIZE: usize = 120;

/// Upper bound for a history query
pub const MAX_HISTORY_LIMIT: usize = 2000;

/// Shortest tick interval; anything below is raised to this
pub const MIN_BROADCAST_INTERVAL: Duration = Duration::from_millis(1);

/// Environment variable holding the tick interval in seconds
pub const ENV_BROADCAST_INTERVAL: &str = "BROADCAST_INTERVAL_SECONDS";
/// Environment variable holding the snapshot size
pub const ENV_SNAPSHOT_SIZE: &str = "DEFAULT_SNAPSHOT_SIZE";
/// Environment variable holding the in-memory window size
pub const ENV_MEMORY_WINDOW: &str = "MEMORY_WINDOW";

/// Production and bootstrap settings
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Time between production ticks
    pub broadcast_interval: Duration,

    /// Number of recent readings sent to a new client (1..=120)
    pub snapshot_size: usize,

    /// Readings retained by the in-memory store
    pub memory_window: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            broadcast_interval: Duration::from_secs(1),
            snapshot_size: MAX_SNAPSHOT_SIZE,
            memory_window: 500,
        }
    }
}

impl FeedConfig {
    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names
    ///
    /// Unset variables keep their default. Values that do not parse, a
    /// non-positive or unrepresentable interval and a snapshot size outside
    /// 1..=120 are rejected. Intervals under a millisecond are raised to one.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BROADCAST_INTERVAL) {
            let secs: f64 = parse(ENV_BROADCAST_INTERVAL, &raw)?;
            config = config.broadcast_interval(interval_from_secs(ENV_BROADCAST_INTERVAL, secs)?);
        }

        if let Some(raw) = lookup(ENV_SNAPSHOT_SIZE) {
            let size: usize = parse(ENV_SNAPSHOT_SIZE, &raw)?;
            if !(1..=MAX_SNAPSHOT_SIZE).contains(&size) {
                return Err(Error::Config(format!(
                    "{} must be within 1..={}, got {}",
                    ENV_SNAPSHOT_SIZE, MAX_SNAPSHOT_SIZE, size
                )));
            }
            config.snapshot_size = size;
        }

        if let Some(raw) = lookup(ENV_MEMORY_WINDOW) {
            let window: usize = parse(ENV_MEMORY_WINDOW, &raw)?;
            config = config.memory_window(window);
        }

        Ok(config)
    }

    /// Set the tick interval (at least one millisecond)
    pub fn broadcast_interval(mut self, interval: Duration) -> Self {
        self.broadcast_interval = interval.max(MIN_BROADCAST_INTERVAL);
        self
    }

    /// Tick interval actually used, never below [`MIN_BROADCAST_INTERVAL`]
    pub fn effective_interval(&self) -> Duration {
        self.broadcast_interval.max(MIN_BROADCAST_INTERVAL)
    }

    /// Snapshot size actually used, within 1..=120
    pub fn effective_snapshot_size(&self) -> usize {
        self.snapshot_size.clamp(1, MAX_SNAPSHOT_SIZE)
    }

    /// Set the snapshot size, clamped to 1..=120
    pub fn snapshot_size(mut self, size: usize) -> Self {
        self.snapshot_size = size.clamp(1, MAX_SNAPSHOT_SIZE);
        self
    }

    /// Set the in-memory window (at least one reading)
    pub fn memory_window(mut self, window: usize) -> Self {
        self.memory_window = window.max(1);
        self
    }
}

/// Convert a seconds value into an interval, rejecting non-positive,
/// non-finite and overflowing values
pub fn interval_from_secs(name: &str, secs: f64) -> Result<Duration> {
    if secs.is_nan() || secs <= 0.0 {
        return Err(Error::Config(format!(
            "{} must be a positive number of seconds, got {}",
            name, secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("{}={}: {}", name, secs, e)))
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("{}={:?}: {}", key, raw, e)))
}
