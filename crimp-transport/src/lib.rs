//! # crimp-transport
//!
//! Async message channel for crimp.
//!
//! This crate provides:
//! - `Channel`: one message in, one message out, over any `AsyncRead` /
//!   `AsyncWrite` pair
//! - Framed (4-byte length prefix) and unframed operation
//! - Clean-EOF vs truncated-message distinction

pub mod channel;
pub mod error;

pub use channel::{Channel, READ_BUFFER_SIZE};
pub use crimp_protocol::Transport;
pub use error::TransportError;
