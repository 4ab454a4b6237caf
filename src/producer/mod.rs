//! Production loop
//!
//! A process-wide singleton task, owned by [`Producer`], that turns readings
//! from a data source into `update` broadcasts.
//!
//! ```text
//!   NotStarted ──ensure_running()──► Running ──stop()/exit──► Stopped
//!                                       ▲                        │
//!                                       └────ensure_running()────┘
//! ```
//!
//! Once started the loop is never stopped by the registry going empty; it
//! idles, skipping every tick until someone is listening again.

pub mod state;
pub mod task;

pub use state::{ProducerState, TickOutcome};
pub use task::{Producer, ProducerContext};
