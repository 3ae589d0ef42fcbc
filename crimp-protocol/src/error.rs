//! Protocol error types.

use crate::ttype::TType;
use thiserror::Error;

/// Errors raised while encoding or decoding Binary Protocol data.
///
/// `UnexpectedEof` is special: when decoding from a still-filling buffer it
/// means "wait for more bytes", and the incremental decoder treats it that
/// way. Inside a complete frame it is a genuine wire-format error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unexpected end of input: need {needed} more bytes")]
    UnexpectedEof { needed: usize },

    #[error("bad version in message header: {0:#010x}")]
    BadVersion(u32),

    #[error("unknown type code: {0:#04x}")]
    UnknownType(u8),

    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),

    #[error("method name is not valid UTF-8")]
    InvalidMethodName,

    #[error("{field} length {value} exceeds limit {cap}")]
    LimitExceeded {
        field: &'static str,
        value: i64,
        cap: usize,
    },

    #[error("negative {field} length")]
    NegativeSize { field: &'static str },

    #[error("value type mismatch: declared {declared}, found {found}")]
    ValueTypeMismatch { declared: TType, found: TType },
}
