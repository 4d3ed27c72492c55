//! Connection identity and the unit of admitted work.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Bundle an accepted stream with its peer as a `ConnectionTask`
//! - Derive the rate-limiting client identifier from the peer address

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// An accepted connection waiting to be handled.
///
/// Submitted once to admission control and consumed by the request pipeline.
#[derive(Debug)]
pub struct ConnectionTask<S> {
    pub id: ConnectionId,
    pub stream: S,
    pub peer: SocketAddr,
}

impl<S> ConnectionTask<S> {
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            id: ConnectionId::new(),
            stream,
            peer,
        }
    }

    /// Rate limiting key: the peer's IP address without the port.
    pub fn client_id(&self) -> String {
        self.peer.ip().to_string()
    }
}
