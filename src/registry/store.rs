//! Connection registry implementation
//!
//! The set of clients currently eligible to receive broadcasts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::handle::{ClientHandle, ClientId};

/// Registry of live client handles
///
/// Mutation happens under the write lock. The live count is mirrored into an
/// atomic that is only updated while the write lock is held, so `count()`
/// never needs the lock and never observes a half applied change.
pub struct ConnectionRegistry {
    /// Live clients keyed by identity
    clients: RwLock<HashMap<ClientId, Arc<dyn ClientHandle>>>,

    /// Number of entries in `clients`
    live: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            live: AtomicUsize::new(0),
        }
    }

    /// Register a client
    ///
    /// Admitting an identity that is already present is a no-op. Returns the
    /// live count after the call.
    pub async fn admit(&self, client: Arc<dyn ClientHandle>) -> usize {
        let mut clients = self.clients.write().await;
        let id = client.id();

        if clients.contains_key(&id) {
            tracing::debug!(client = %id, "Client already registered");
            return clients.len();
        }

        clients.insert(id, client);
        let active = clients.len();
        self.live.store(active, Ordering::Release);

        tracing::info!(client = %id, active = active, "Client connected");
        active
    }

    /// Remove a client if present
    ///
    /// Returns true if the client was registered.
    pub async fn evict(&self, id: ClientId) -> bool {
        let mut clients = self.clients.write().await;

        let removed = clients.remove(&id).is_some();
        if removed {
            let active = clients.len();
            self.live.store(active, Ordering::Release);
            tracing::info!(client = %id, active = active, "Client disconnected");
        }
        removed
    }

    /// Number of live clients, read without taking the lock
    pub fn count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Whether no client is registered
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether `id` is currently registered
    pub async fn contains(&self, id: ClientId) -> bool {
        self.clients.read().await.contains_key(&id)
    }

    /// Point-in-time copy of the members, ordered by id
    ///
    /// Broadcasts iterate the copy, so admits and evicts that race with a
    /// broadcast never touch the collection being walked.
    pub async fn snapshot(&self) -> Vec<Arc<dyn ClientHandle>> {
        let clients = self.clients.read().await;
        let mut members: Vec<_> = clients.values().cloned().collect();
        members.sort_by_key(|c| c.id());
        members
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockClient;

    #[tokio::test]
    async fn test_admit_and_evict() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());

        let a = MockClient::new(1);
        let b = MockClient::new(2);

        assert_eq!(registry.admit(a.clone()).await, 1);
        assert_eq!(registry.admit(b.clone()).await, 2);
        assert_eq!(registry.count(), 2);
        assert!(registry.contains(ClientId::new(1)).await);

        assert!(registry.evict(ClientId::new(1)).await);
        assert_eq!(registry.count(), 1);
        assert!(!registry.contains(ClientId::new(1)).await);
    }

    #[tokio::test]
    async fn test_admit_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let a = MockClient::new(1);

        registry.admit(a.clone()).await;
        registry.admit(a.clone()).await;

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.admit(MockClient::new(1)).await;

        assert!(!registry.evict(ClientId::new(42)).await);
        assert_eq!(registry.count(), 1);

        // Evicting twice is also fine
        assert!(registry.evict(ClientId::new(1)).await);
        assert!(!registry.evict(ClientId::new(1)).await);
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let registry = ConnectionRegistry::new();
        registry.admit(MockClient::new(2)).await;
        registry.admit(MockClient::new(1)).await;

        let snapshot = registry.snapshot().await;
        registry.evict(ClientId::new(1)).await;
        registry.admit(MockClient::new(3)).await;

        let ids: Vec<u64> = snapshot.iter().map(|c| c.id().get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(registry.count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_membership() {
        let registry = Arc::new(ConnectionRegistry::new());

        let mut tasks = Vec::new();
        for id in 0..64u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.admit(MockClient::new(id)).await;
                // Odd ids leave again
                if id % 2 == 1 {
                    registry.evict(ClientId::new(id)).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.count(), 32);
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.len(), 32);
        assert!(snapshot.iter().all(|c| c.id().get() % 2 == 0));
    }
}
