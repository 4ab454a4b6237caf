//! Bounded in-memory record store

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::reading::Reading;
use super::store::RecordStore;

struct Window {
    readings: VecDeque<Reading>,
    next_id: i64,
}

/// Store keeping only the most recent `capacity` readings
///
/// Readings are kept sorted by timestamp, so a late reading lands in its
/// proper place rather than at the tail.
pub struct MemoryStore {
    window: Mutex<Window>,
    capacity: usize,
}

impl MemoryStore {
    /// Create a store holding at most `capacity` readings (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: Mutex::new(Window {
                readings: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            capacity,
        }
    }

    /// Maximum number of retained readings
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained readings
    pub fn len(&self) -> usize {
        self.window.lock().map(|w| w.readings.len()).unwrap_or(0)
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, reading: Reading) -> Result<Reading> {
        let mut window = self
            .window
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;

        let saved = reading.with_id(window.next_id);
        window.next_id += 1;

        let key = saved.sort_key();
        let pos = window.readings.partition_point(|r| r.sort_key() <= key);
        window.readings.insert(pos, saved.clone());

        while window.readings.len() > self.capacity {
            window.readings.pop_front();
        }

        Ok(saved)
    }

    async fn query_recent(&self, limit: usize) -> Result<Vec<Reading>> {
        let window = self
            .window
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".into()))?;

        let skip = window.readings.len().saturating_sub(limit);
        Ok(window.readings.iter().skip(skip).cloned().collect())
    }
}
