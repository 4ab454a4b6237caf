//! Session state machine
//!
//! Tracks one WebSocket connection from handshake to close.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// TCP accepted, WebSocket handshake in progress
    Handshaking,
    /// Registered, snapshot being sent
    Bootstrapping,
    /// Receiving broadcasts
    Live,
    /// Close in progress
    Closing,
    /// Connection gone
    Closed,
}

/// Per-connection bookkeeping
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID (also the registry client id)
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// When the TCP connection was accepted
    pub connected_at: Instant,

    /// When the snapshot was delivered
    pub live_at: Option<Instant>,

    /// Inbound frames seen (ignored, only counted)
    pub frames_received: u64,
}

impl SessionState {
    /// Create a new session in the handshaking phase
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Handshaking,
            connected_at: Instant::now(),
            live_at: None,
            frames_received: 0,
        }
    }

    /// Handshake done, client being admitted
    pub fn start_bootstrap(&mut self) {
        if self.phase == SessionPhase::Handshaking {
            self.phase = SessionPhase::Bootstrapping;
        }
    }

    /// Snapshot delivered
    pub fn go_live(&mut self) {
        if self.phase == SessionPhase::Bootstrapping {
            self.phase = SessionPhase::Live;
            self.live_at = Some(Instant::now());
        }
    }

    /// Count an inbound frame
    pub fn on_frame(&mut self) {
        self.frames_received += 1;
    }

    /// Start closing the session
    pub fn close(&mut self) {
        if self.phase != SessionPhase::Closed {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Mark the session as gone
    pub fn finish(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Check if session is receiving broadcasts
    pub fn is_live(&self) -> bool {
        self.phase == SessionPhase::Live
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Time spent receiving broadcasts, if the session got that far
    pub fn live_duration(&self) -> Option<Duration> {
        self.live_at.map(|at| at.elapsed())
    }
}
