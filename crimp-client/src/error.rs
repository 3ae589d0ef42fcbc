//! Client error types.

use crimp_pinch::{ApplicationException, PinchError};
use crimp_protocol::{MessageType, ProtocolError};
use crimp_transport::TransportError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("mapping error: {0}")]
    Pinch(#[from] PinchError),

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("connection closed")]
    Closed,

    #[error("sequence id mismatch: expected {expected}, got {got}")]
    SeqIdMismatch { expected: i32, got: i32 },

    #[error("remote exception: {0}")]
    Remote(ApplicationException),

    #[error("unexpected {0} message in reply position")]
    UnexpectedReply(MessageType),
}
