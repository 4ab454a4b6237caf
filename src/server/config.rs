//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::feed::interval_from_secs;

/// Environment variable holding the bind address
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
/// Environment variable holding the WebSocket route
pub const ENV_WS_ROUTE: &str = "WS_ROUTE";
/// Environment variable holding the connection limit
pub const ENV_MAX_CONNECTIONS: &str = "MAX_CONNECTIONS";
/// Environment variable holding the per-write timeout in seconds
pub const ENV_SEND_TIMEOUT: &str = "SEND_TIMEOUT_SECONDS";

/// Server configuration options
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path accepted for the WebSocket upgrade
    pub ws_route: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// A single write to a client must complete within this time
    pub send_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            ws_route: "/ws".to_string(),
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            send_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Updates are small and latency sensitive
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Load from the process environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_BIND_ADDR) {
            let addr = raw
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{}={:?}: {}", ENV_BIND_ADDR, raw, e)))?;
            config = config.bind(addr);
        }
        if let Some(raw) = lookup(ENV_WS_ROUTE) {
            config = config.ws_route(raw.trim());
        }
        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            let max = raw.trim().parse().map_err(|e| {
                Error::Config(format!("{}={:?}: {}", ENV_MAX_CONNECTIONS, raw, e))
            })?;
            config = config.max_connections(max);
        }
        if let Some(raw) = lookup(ENV_SEND_TIMEOUT) {
            let secs: f64 = raw.trim().parse().map_err(|e| {
                Error::Config(format!("{}={:?}: {}", ENV_SEND_TIMEOUT, raw, e))
            })?;
            config = config.send_timeout(interval_from_secs(ENV_SEND_TIMEOUT, secs)?);
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket route; a leading `/` is added if missing
    pub fn ws_route(mut self, route: impl Into<String>) -> Self {
        let route = route.into();
        self.ws_route = if route.starts_with('/') {
            route
        } else {
            format!("/{}", route)
        };
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the per-write timeout; a client slower than this is dropped
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }
}
