//! # crimp-protocol
//!
//! Thrift Binary Protocol codec for crimp.
//!
//! This crate provides:
//! - The typed dynamic value model (`TType`, `Value`)
//! - Big-endian byte builder and positional getter primitives
//! - The Binary Protocol encoder/decoder for values and messages
//! - Strict and legacy message framings
//! - Length-prefixed frame codec and incremental message decoding
//! - Configurable parsing bounds enforced before allocation
//!
//! The crate is sans-I/O: everything here is a pure function of bytes.

pub mod binary;
pub mod error;
pub mod frame;
pub mod message;
pub mod options;
pub mod ttype;
pub mod value;
pub mod wire;

pub use binary::{decode_message, decode_value, encode_message, encode_value, STRICT_VERSION};
pub use error::ProtocolError;
pub use frame::{frame_message, MessageDecoder, Transport, FRAME_HEADER_SIZE};
pub use message::{Message, MessageType};
pub use options::{MethodNameParser, ProtocolOptions};
pub use ttype::TType;
pub use value::Value;
