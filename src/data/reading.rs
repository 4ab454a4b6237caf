//! Sensor reading record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped measurement
///
/// Produced by a [`DataSource`](super::DataSource), given an id by a
/// [`RecordStore`](super::RecordStore) and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Store-assigned identity (None until persisted)
    pub id: Option<i64>,
    /// Time of measurement (RFC 3339 on the wire)
    pub timestamp: DateTime<Utc>,
    /// Temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl Reading {
    /// Create an unsaved reading stamped with the current time
    pub fn now(temperature: f64, humidity: f64) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            temperature,
            humidity,
        }
    }

    /// Return a copy carrying the given store id
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Ordering key: timestamp, then id for readings in the same instant
    pub fn sort_key(&self) -> (DateTime<Utc>, i64) {
        (self.timestamp, self.id.unwrap_or(i64::MAX))
    }
}
