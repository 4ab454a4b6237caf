//! Producer lifecycle states

/// Lifecycle of the singleton production loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerState {
    /// Never started
    NotStarted,
    /// A loop instance is live
    Running,
    /// The last instance was cancelled or exited; a start creates a new one
    Stopped,
}

impl ProducerState {
    /// Whether a loop instance is live
    pub fn is_running(&self) -> bool {
        matches!(self, ProducerState::Running)
    }
}

/// What one tick of the loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nobody was listening; nothing produced
    Skipped,
    /// A reading was produced, persisted and broadcast
    Produced {
        /// Clients that received the update
        delivered: usize,
    },
    /// Production or persistence failed; the loop carries on
    Failed,
}
