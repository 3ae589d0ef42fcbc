//! Mapping error types.

use crimp_protocol::TType;
use thiserror::Error;

/// Errors raised while converting between user records and dynamic values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PinchError {
    #[error("wrong value type: expected {expected}, got {got}")]
    WrongType { expected: TType, got: TType },

    #[error("{strct} is missing required field {id}")]
    MissingField { strct: &'static str, id: i16 },

    #[error("unknown {enum_name} value: {value}")]
    UnknownEnum {
        enum_name: &'static str,
        value: i32,
    },

    #[error("{strct} union invalid: {reason}")]
    BadUnion {
        strct: &'static str,
        reason: &'static str,
    },

    #[error("binary value is not valid UTF-8")]
    InvalidUtf8,
}
