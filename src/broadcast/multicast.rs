//! Best-effort multicast to every registered client

use std::sync::Arc;

use futures_util::future::join_all;

use crate::error::Result;
use crate::registry::{ClientHandle, ClientId, ConnectionRegistry, Frame};
use crate::stats::FeedStats;

use super::message::Message;

/// Outcome of one broadcast
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Clients in the registry snapshot
    pub attempted: usize,
    /// Clients that accepted the frame
    pub delivered: usize,
    /// Clients evicted because their send failed
    pub evicted: Vec<ClientId>,
}

/// Fans a message out to every client in the registry
///
/// Each delivery is an independent future; all of them are polled
/// concurrently and awaited together. A failed send evicts that client and
/// nothing else: it never aborts or delays the other deliveries.
pub struct Multicaster {
    registry: Arc<ConnectionRegistry>,
    stats: Arc<FeedStats>,
}

impl Multicaster {
    /// Create a multicaster over `registry`
    pub fn new(registry: Arc<ConnectionRegistry>, stats: Arc<FeedStats>) -> Self {
        Self { registry, stats }
    }

    /// Registry this multicaster delivers to
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Encode `message` once and deliver it to every live client
    pub async fn broadcast(&self, message: &Message) -> Result<BroadcastReport> {
        let frame = message.encode()?;
        Ok(self.broadcast_frame(frame).await)
    }

    /// Deliver an already encoded frame to every live client
    ///
    /// Returns immediately when nobody is registered.
    pub async fn broadcast_frame(&self, frame: Frame) -> BroadcastReport {
        let clients = self.registry.snapshot().await;
        if clients.is_empty() {
            return BroadcastReport::default();
        }

        let deliveries = clients
            .iter()
            .map(|client| self.deliver(client.as_ref(), frame.clone()));
        let outcomes = join_all(deliveries).await;

        let mut report = BroadcastReport {
            attempted: clients.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(id) => report.evicted.push(id),
            }
        }

        self.stats
            .record_broadcast(report.delivered, report.evicted.len());

        tracing::debug!(
            kind = %frame.kind(),
            bytes = frame.len(),
            delivered = report.delivered,
            evicted = report.evicted.len(),
            "Broadcast complete"
        );

        report
    }

    /// Send to one client, evicting it on failure
    async fn deliver(&self, client: &dyn ClientHandle, frame: Frame) -> std::result::Result<(), ClientId> {
        let id = client.id();
        match client.send(frame).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::warn!(client = %id, error = %e, "Send failed; removing client");
                self.registry.evict(id).await;
                Err(id)
            }
        }
    }
}
