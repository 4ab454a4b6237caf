//! Persistence boundary

use async_trait::async_trait;

use crate::error::Result;

use super::reading::Reading;

/// Persistent store for readings
///
/// Called from the production loop (`save`) and on every admission
/// (`query_recent`). Implementations handle their own synchronization.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a reading, returning its canonical form with an id assigned
    async fn save(&self, reading: Reading) -> Result<Reading>;

    /// At most `limit` of the most recent readings, ordered oldest to newest
    async fn query_recent(&self, limit: usize) -> Result<Vec<Reading>>;
}
