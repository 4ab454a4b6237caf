//! Counters for connections, broadcasts and production ticks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters shared by the feed, multicaster and producer
#[derive(Debug)]
pub struct FeedStats {
    started_at: Instant,
    connections_total: AtomicU64,
    broadcasts: AtomicU64,
    frames_delivered: AtomicU64,
    delivery_failures: AtomicU64,
    ticks_produced: AtomicU64,
    ticks_skipped: AtomicU64,
    ticks_failed: AtomicU64,
}

impl FeedStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_total: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            frames_delivered: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            ticks_produced: AtomicU64::new(0),
            ticks_skipped: AtomicU64::new(0),
            ticks_failed: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_connection(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, delivered: usize, failed: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.frames_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.delivery_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_tick_produced(&self) {
        self.ticks_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tick_skipped(&self) {
        self.ticks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tick_failed(&self) {
        self.ticks_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            ticks_produced: self.ticks_produced.load(Ordering::Relaxed),
            ticks_skipped: self.ticks_skipped.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }
}

impl Default for FeedStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`FeedStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Connections admitted since start
    pub connections_total: u64,
    /// Broadcasts that reached at least one client
    pub broadcasts: u64,
    /// Frames successfully delivered
    pub frames_delivered: u64,
    /// Sends that failed and caused an eviction
    pub delivery_failures: u64,
    /// Ticks that produced, persisted and broadcast a reading
    pub ticks_produced: u64,
    /// Ticks skipped because nobody was listening
    pub ticks_skipped: u64,
    /// Ticks whose production or persistence failed
    pub ticks_failed: u64,
    /// Uptime when the snapshot was taken
    pub uptime: Duration,
}

impl StatsSnapshot {
    /// Total ticks observed by the producer
    pub fn ticks(&self) -> u64 {
        self.ticks_produced + self.ticks_skipped + self.ticks_failed
    }

    /// Fraction of delivery attempts that failed
    pub fn failure_ratio(&self) -> f64 {
        let attempts = self.frames_delivered + self.delivery_failures;
        if attempts > 0 {
            self.delivery_failures as f64 / attempts as f64
        } else {
            0.0
        }
    }
}
