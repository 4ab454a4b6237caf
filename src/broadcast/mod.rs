//! Message envelope and multicast
//!
//! ```text
//!   Message ──encode()──► Frame (Arc<str>)
//!                           │
//!        registry.snapshot()│
//!         ┌─────────────────┼─────────────────┐
//!         ▼                 ▼                 ▼
//!    client.send()     client.send()     client.send()   (joined concurrently)
//!         │                 │                 │
//!        ok               error ──► registry.evict(id)
//! ```

pub mod message;
pub mod multicast;

pub use message::Message;
pub use multicast::{BroadcastReport, Multicaster};
