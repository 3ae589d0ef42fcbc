//! Per-connection context.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// State the server shares with handlers for one connection.
#[derive(Debug)]
pub struct ConnContext {
    id: String,
    peer: Option<SocketAddr>,
    requests: AtomicU64,
}

impl ConnContext {
    /// Creates a context for a connection. `peer` is absent for in-memory
    /// channels.
    pub fn new(peer: Option<SocketAddr>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer,
            requests: AtomicU64::new(0),
        }
    }

    /// Unique connection id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Remote address, if the channel has one.
    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Messages dispatched on this connection so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub(crate) fn note_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}
