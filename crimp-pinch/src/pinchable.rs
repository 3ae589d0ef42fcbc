//! The record-to-value mapping contract.

use crate::error::PinchError;
use bytes::Bytes;
use crimp_protocol::{TType, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// Bidirectional conversion between a user type and the dynamic value
/// model.
///
/// `unpinch(pinch(x)) == x` for every valid `x`; the conversion never
/// mutates the underlying value and never swallows an error. Optionality
/// is a field-level concern handled by [`crate::StructBuilder`] and
/// [`crate::StructParser`], not by this trait.
pub trait Pinchable: Sized {
    /// Wire tag of this type's encoding.
    fn ttype() -> TType;

    /// Converts into the dynamic value model.
    fn pinch(&self) -> Value;

    /// Reconstructs from the dynamic value model.
    fn unpinch(value: &Value) -> Result<Self, PinchError>;
}

/// Converts a record into a dynamic value.
pub fn pinch<T: Pinchable>(value: &T) -> Value {
    value.pinch()
}

/// Reconstructs a record from a dynamic value.
pub fn unpinch<T: Pinchable>(value: &Value) -> Result<T, PinchError> {
    T::unpinch(value)
}

fn wrong_type<T>(expected: TType, got: &Value) -> Result<T, PinchError> {
    Err(PinchError::WrongType {
        expected,
        got: got.ttype(),
    })
}

macro_rules! pinch_primitive {
    ($ty:ty, $tag:ident) => {
        impl Pinchable for $ty {
            fn ttype() -> TType {
                TType::$tag
            }

            fn pinch(&self) -> Value {
                Value::$tag(*self)
            }

            fn unpinch(value: &Value) -> Result<Self, PinchError> {
                match value {
                    Value::$tag(v) => Ok(*v),
                    other => wrong_type(TType::$tag, other),
                }
            }
        }
    };
}

pinch_primitive!(bool, Bool);
pinch_primitive!(i8, Byte);
pinch_primitive!(f64, Double);
pinch_primitive!(i16, Int16);
pinch_primitive!(i32, Int32);
pinch_primitive!(i64, Int64);

impl Pinchable for Bytes {
    fn ttype() -> TType {
        TType::Binary
    }

    fn pinch(&self) -> Value {
        Value::Binary(self.clone())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        match value {
            Value::Binary(v) => Ok(v.clone()),
            other => wrong_type(TType::Binary, other),
        }
    }
}

impl Pinchable for String {
    fn ttype() -> TType {
        TType::Binary
    }

    fn pinch(&self) -> Value {
        Value::text(self)
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        match value {
            Value::Binary(v) => std::str::from_utf8(v)
                .map(str::to_owned)
                .map_err(|_| PinchError::InvalidUtf8),
            other => wrong_type(TType::Binary, other),
        }
    }
}

impl<T: Pinchable> Pinchable for Vec<T> {
    fn ttype() -> TType {
        TType::List
    }

    fn pinch(&self) -> Value {
        Value::List(T::ttype(), self.iter().map(Pinchable::pinch).collect())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        match value {
            Value::List(elem, items) if *elem == T::ttype() => {
                items.iter().map(T::unpinch).collect()
            }
            Value::List(elem, _) => Err(PinchError::WrongType {
                expected: T::ttype(),
                got: *elem,
            }),
            other => wrong_type(TType::List, other),
        }
    }
}

fn pinch_set<'a, T: Pinchable + 'a>(items: impl Iterator<Item = &'a T>) -> Value {
    Value::Set(T::ttype(), items.map(Pinchable::pinch).collect())
}

fn unpinch_set<T, C>(value: &Value) -> Result<C, PinchError>
where
    T: Pinchable,
    C: FromIterator<T>,
{
    match value {
        Value::Set(elem, items) if *elem == T::ttype() => items.iter().map(T::unpinch).collect(),
        Value::Set(elem, _) => Err(PinchError::WrongType {
            expected: T::ttype(),
            got: *elem,
        }),
        other => wrong_type(TType::Set, other),
    }
}

impl<T: Pinchable + Eq + Hash> Pinchable for HashSet<T> {
    fn ttype() -> TType {
        TType::Set
    }

    fn pinch(&self) -> Value {
        pinch_set(self.iter())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        unpinch_set(value)
    }
}

impl<T: Pinchable + Ord> Pinchable for BTreeSet<T> {
    fn ttype() -> TType {
        TType::Set
    }

    fn pinch(&self) -> Value {
        pinch_set(self.iter())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        unpinch_set(value)
    }
}

fn pinch_map<'a, K: Pinchable + 'a, V: Pinchable + 'a>(
    entries: impl Iterator<Item = (&'a K, &'a V)>,
) -> Value {
    Value::Map(
        K::ttype(),
        V::ttype(),
        entries.map(|(k, v)| (k.pinch(), v.pinch())).collect(),
    )
}

fn unpinch_map<K, V, C>(value: &Value) -> Result<C, PinchError>
where
    K: Pinchable,
    V: Pinchable,
    C: FromIterator<(K, V)>,
{
    match value {
        Value::Map(key, val, entries) if *key == K::ttype() && *val == V::ttype() => entries
            .iter()
            .map(|(k, v)| Ok((K::unpinch(k)?, V::unpinch(v)?)))
            .collect(),
        Value::Map(key, _, _) if *key != K::ttype() => Err(PinchError::WrongType {
            expected: K::ttype(),
            got: *key,
        }),
        Value::Map(_, val, _) => Err(PinchError::WrongType {
            expected: V::ttype(),
            got: *val,
        }),
        other => wrong_type(TType::Map, other),
    }
}

impl<K: Pinchable + Eq + Hash, V: Pinchable> Pinchable for HashMap<K, V> {
    fn ttype() -> TType {
        TType::Map
    }

    fn pinch(&self) -> Value {
        pinch_map(self.iter())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        unpinch_map(value)
    }
}

impl<K: Pinchable + Ord, V: Pinchable> Pinchable for BTreeMap<K, V> {
    fn ttype() -> TType {
        TType::Map
    }

    fn pinch(&self) -> Value {
        pinch_map(self.iter())
    }

    fn unpinch(value: &Value) -> Result<Self, PinchError> {
        unpinch_map(value)
    }
}

/// Assembles a struct value field by field.
///
/// Absent optional fields contribute no entry to the struct map.
#[derive(Debug, Default)]
pub struct StructBuilder {
    fields: BTreeMap<i16, Value>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    pub fn field<T: Pinchable>(mut self, id: i16, value: &T) -> Self {
        self.fields.insert(id, value.pinch());
        self
    }

    /// Adds an optional field; `None` is omitted entirely.
    pub fn optional<T: Pinchable>(self, id: i16, value: Option<&T>) -> Self {
        match value {
            Some(v) => self.field(id, v),
            None => self,
        }
    }

    pub fn build(self) -> Value {
        Value::Struct(self.fields)
    }
}

/// Declares an i32-tagged enumeration together with its [`Pinchable`] impl.
///
/// ```
/// crimp_pinch::pinch_enum! {
///     /// Arithmetic operation selector.
///     pub enum CalcOp {
///         Plus = 1,
///         Minus = 2,
///         Div = 3,
///     }
/// }
/// ```
///
/// The enum encodes as `Int32`; decoding an integer outside the declared
/// tags yields [`PinchError::UnknownEnum`].
#[macro_export]
macro_rules! pinch_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $tag),+
        }

        impl $crate::Pinchable for $name {
            fn ttype() -> $crate::protocol::TType {
                $crate::protocol::TType::Int32
            }

            fn pinch(&self) -> $crate::protocol::Value {
                $crate::protocol::Value::Int32(*self as i32)
            }

            fn unpinch(
                value: &$crate::protocol::Value,
            ) -> ::std::result::Result<Self, $crate::PinchError> {
                match <i32 as $crate::Pinchable>::unpinch(value)? {
                    $($tag => Ok($name::$variant),)+
                    other => Err($crate::PinchError::UnknownEnum {
                        enum_name: stringify!($name),
                        value: other,
                    }),
                }
            }
        }
    };
}
