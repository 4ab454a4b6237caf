//! Connection registry
//!
//! Tracks the clients that are currently eligible to receive broadcasts.
//! The registry holds shared, non-owning handles: the transport creates and
//! tears down the underlying connection.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ConnectionRegistry>
//!                 ┌──────────────────────────────┐
//!                 │ clients: HashMap<ClientId,   │
//!                 │   Arc<dyn ClientHandle>>     │
//!                 │ live: AtomicUsize            │
//!                 └──────────────┬───────────────┘
//!                                │
//!         ┌──────────────────────┼──────────────────────┐
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//!    [connection]           [Multicaster]          [Producer]
//!    admit() / evict()      snapshot()             count()
//! ```
//!
//! Membership is self-healing: a failed send during a broadcast evicts the
//! client, as does a disconnect or an explicit close.

pub mod frame;
pub mod handle;
pub mod store;

pub use frame::{Frame, MessageKind};
pub use handle::{ClientHandle, ClientId, CLOSE_GOING_AWAY, CLOSE_INTERNAL_ERROR, CLOSE_NORMAL};
pub use store::ConnectionRegistry;
