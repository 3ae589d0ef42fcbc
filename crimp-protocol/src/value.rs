//! The dynamic value model.

use crate::ttype::TType;
use bytes::Bytes;
use std::collections::BTreeMap;

/// A Thrift value, tagged by its runtime [`TType`].
///
/// Containers carry the element tag(s) declared in their wire header so an
/// empty container still knows its element type. Struct fields are keyed by
/// field id; insertion order is not meaningful and re-encode emits fields
/// in ascending id order followed by the stop byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    Double(f64),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Binary(Bytes),
    Struct(BTreeMap<i16, Value>),
    List(TType, Vec<Value>),
    Set(TType, Vec<Value>),
    Map(TType, TType, Vec<(Value, Value)>),
}

impl Value {
    /// The runtime tag of this value.
    pub fn ttype(&self) -> TType {
        match self {
            Value::Bool(_) => TType::Bool,
            Value::Byte(_) => TType::Byte,
            Value::Double(_) => TType::Double,
            Value::Int16(_) => TType::Int16,
            Value::Int32(_) => TType::Int32,
            Value::Int64(_) => TType::Int64,
            Value::Binary(_) => TType::Binary,
            Value::Struct(_) => TType::Struct,
            Value::List(_, _) => TType::List,
            Value::Set(_, _) => TType::Set,
            Value::Map(_, _, _) => TType::Map,
        }
    }

    /// Builds a struct value from `(field id, value)` pairs.
    pub fn struct_from(fields: impl IntoIterator<Item = (i16, Value)>) -> Value {
        Value::Struct(fields.into_iter().collect())
    }

    /// Binary value from a UTF-8 string.
    pub fn text(s: impl AsRef<str>) -> Value {
        Value::Binary(Bytes::copy_from_slice(s.as_ref().as_bytes()))
    }

    /// The field map, if this is a struct.
    pub fn as_struct(&self) -> Option<&BTreeMap<i16, Value>> {
        match self {
            Value::Struct(fields) => Some(fields),
            _ => None,
        }
    }
}
