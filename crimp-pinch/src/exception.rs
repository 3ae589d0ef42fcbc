//! The standard remote-failure payload.

use crate::error::PinchError;
use crate::parser::StructParser;
use crate::pinch_enum;
use crate::pinchable::{Pinchable, StructBuilder};
use crimp_protocol::{TType, Value};
use std::fmt;

pinch_enum! {
    /// Machine-readable category carried in field 2 of an exception payload.
    pub enum ExceptionKind {
        Unknown = 0,
        UnknownMethod = 1,
        InvalidMessageType = 2,
        InternalError = 6,
        ProtocolError = 7,
    }
}

/// Payload of an `Exception` message.
///
/// Wire shape: `{ 1: optional binary message, 2: optional i32 kind }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationException {
    pub message: Option<String>,
    pub kind: ExceptionKind,
}

impl ApplicationException {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            kind,
        }
    }

    pub fn unknown_method(name: &str) -> Self {
        Self::new(ExceptionKind::UnknownMethod, format!("method not found: {name}"))
    }
}

impl fmt::Display for ApplicationException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{:?}: {}", self.kind, message),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl std::error::Error for ApplicationException {}

impl Pinchable for ApplicationException {
    fn ttype() -> TType {
        TType::Struct
    }

    fn pinch(&self) -> Value {
        StructBuilder::new()
            .optional(1, self.message.as_ref())
            .field(2, &self.kind)
            .build()
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        let p = StructParser::new("ApplicationException", value)?;
        Ok(Self {
            message: p.optional(1)?,
            // Peers may omit the kind; treat that as Unknown rather than
            // failing the whole exception decode.
            kind: p.optional(2)?.unwrap_or(ExceptionKind::Unknown),
        })
    }
}
