//! Transport error types.

use crimp_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised while moving messages over a byte channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport closed")]
    Closed,

    #[error("connection closed mid-message with {buffered} bytes pending")]
    TruncatedFrame { buffered: usize },
}
