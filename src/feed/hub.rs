//! Feed composition root
//!
//! [`LiveFeed`] wires the registry, multicaster, producer and store together
//! and is the object the transport talks to when clients come and go.

use std::sync::Arc;

use crate::broadcast::{Message, Multicaster};
use crate::data::{DataSource, MemoryStore, Reading, RecordStore};
use crate::error::Result;
use crate::producer::{Producer, ProducerContext, ProducerState};
use crate::registry::{ClientHandle, ClientId, ConnectionRegistry};
use crate::stats::{FeedStats, StatsSnapshot};

use super::config::{FeedConfig, MAX_HISTORY_LIMIT};

/// Shared state behind every client connection
pub struct LiveFeed {
    config: FeedConfig,
    registry: Arc<ConnectionRegistry>,
    multicaster: Arc<Multicaster>,
    producer: Producer,
    store: Arc<dyn RecordStore>,
    stats: Arc<FeedStats>,
}

impl LiveFeed {
    /// Create a feed over the given source and store
    ///
    /// The production loop is not started until the first client connects.
    pub fn new(
        config: FeedConfig,
        source: Arc<dyn DataSource>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let stats = Arc::new(FeedStats::new());
        let multicaster = Arc::new(Multicaster::new(Arc::clone(&registry), Arc::clone(&stats)));

        let producer = Producer::new(ProducerContext {
            registry: Arc::clone(&registry),
            multicaster: Arc::clone(&multicaster),
            source,
            store: Arc::clone(&store),
            stats: Arc::clone(&stats),
            interval: config.effective_interval(),
        });

        Self {
            config,
            registry,
            multicaster,
            producer,
            store,
            stats,
        }
    }

    /// Create a feed persisting into a bounded in-memory store
    pub fn with_memory_store(config: FeedConfig, source: Arc<dyn DataSource>) -> Self {
        let store = Arc::new(MemoryStore::new(config.memory_window));
        Self::new(config, source, store)
    }

    /// Feed configuration
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Multicaster delivering to the registry
    pub fn multicaster(&self) -> &Arc<Multicaster> {
        &self.multicaster
    }

    /// Production loop state
    pub fn producer_state(&self) -> ProducerState {
        self.producer.state()
    }

    /// Number of live clients
    pub fn active_clients(&self) -> usize {
        self.registry.count()
    }

    /// Admit a client and bootstrap it with recent history
    ///
    /// Registers the client, makes sure the production loop is running, then
    /// sends one `snapshot` message to this client only. Returns the number
    /// of readings in the snapshot.
    ///
    /// On error the client stays registered; the caller decides whether the
    /// failure is a disconnect or warrants closing the connection.
    pub async fn connect(&self, client: Arc<dyn ClientHandle>) -> Result<usize> {
        let id = client.id();
        self.registry.admit(Arc::clone(&client)).await;
        self.stats.record_connection();

        if self.producer.ensure_running() {
            tracing::debug!(client = %id, "Producer started on admission");
        }

        let snapshot = self
            .store
            .query_recent(self.config.effective_snapshot_size())
            .await?;
        let count = snapshot.len();
        client.send(Message::Snapshot(snapshot).encode()?).await?;

        tracing::info!(client = %id, records = count, "Sent snapshot");
        Ok(count)
    }

    /// Remove a client after a routine disconnect
    pub async fn disconnect(&self, id: ClientId) -> bool {
        self.registry.evict(id).await
    }

    /// Close a client's connection, then remove it
    ///
    /// Close failures are ignored: the client is evicted either way.
    pub async fn close(&self, client: &dyn ClientHandle, code: u16, reason: &str) {
        let id = client.id();
        if let Err(e) = client.close(code, reason).await {
            tracing::debug!(client = %id, error = %e, "Close failed");
        }
        self.registry.evict(id).await;
    }

    /// Recent readings, oldest to newest
    ///
    /// `limit` is clamped to 1..=2000.
    pub async fn history(&self, limit: usize) -> Result<Vec<Reading>> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        self.store.query_recent(limit).await
    }

    /// Stop the production loop
    ///
    /// Registered clients are left alone; nothing pending is flushed.
    pub async fn shutdown(&self) {
        self.producer.stop().await;
        tracing::info!(active = self.registry.count(), "Feed shut down");
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
