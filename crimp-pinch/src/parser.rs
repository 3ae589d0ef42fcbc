//! Field extraction over decoded struct values.
//!
//! Composition is ordinary `Result` threading: `?` short-circuits on the
//! first failure, [`alt`] retries from the same input, and [`catch`]
//! exposes both outcomes.

use crate::error::PinchError;
use crate::pinchable::Pinchable;
use crimp_protocol::{TType, Value};
use std::collections::BTreeMap;

/// Pulls typed fields out of a `Value::Struct` by field id.
#[derive(Debug, Clone, Copy)]
pub struct StructParser<'a> {
    strct: &'static str,
    fields: &'a BTreeMap<i16, Value>,
}

impl<'a> StructParser<'a> {
    /// Wraps a struct value. `strct` names the record in errors.
    pub fn new(strct: &'static str, value: &'a Value) -> Result<Self, PinchError> {
        match value {
            Value::Struct(fields) => Ok(Self { strct, fields }),
            other => Err(PinchError::WrongType {
                expected: TType::Struct,
                got: other.ttype(),
            }),
        }
    }

    /// Extracts a required field.
    pub fn field<T: Pinchable>(&self, id: i16) -> Result<T, PinchError> {
        match self.fields.get(&id) {
            Some(value) => T::unpinch(value),
            None => Err(PinchError::MissingField {
                strct: self.strct,
                id,
            }),
        }
    }

    /// Extracts an optional field; absence is `None`, never an error.
    pub fn optional<T: Pinchable>(&self, id: i16) -> Result<Option<T>, PinchError> {
        self.fields.get(&id).map(T::unpinch).transpose()
    }

    /// Union extraction: the struct must carry exactly one field.
    pub fn single(&self) -> Result<(i16, &'a Value), PinchError> {
        let mut iter = self.fields.iter();
        match (iter.next(), iter.next()) {
            (Some((id, value)), None) => Ok((*id, value)),
            (None, _) => Err(PinchError::BadUnion {
                strct: self.strct,
                reason: "no field set",
            }),
            _ => Err(PinchError::BadUnion {
                strct: self.strct,
                reason: "more than one field set",
            }),
        }
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Tries `first`; on failure runs `second` from the same input.
pub fn alt<T>(
    first: Result<T, PinchError>,
    second: impl FnOnce() -> Result<T, PinchError>,
) -> Result<T, PinchError> {
    first.or_else(|_| second())
}

/// Dispatches on both outcomes of a parse step.
pub fn catch<T, U>(
    result: Result<T, PinchError>,
    on_err: impl FnOnce(PinchError) -> Result<U, PinchError>,
    on_ok: impl FnOnce(T) -> Result<U, PinchError>,
) -> Result<U, PinchError> {
    match result {
        Ok(value) => on_ok(value),
        Err(e) => on_err(e),
    }
}
