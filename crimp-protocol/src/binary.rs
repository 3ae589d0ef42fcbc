//! Binary Protocol encoder and decoder.
//!
//! Values are tag-length-value with fixed-width big-endian integers.
//! Messages encode with the strict header:
//!
//! ```text
//! 0x80 0x01 0x00 type | name_len:i32 | name | seqid:i32 | payload
//! ```
//!
//! Decode accepts both framings: a negative leading i32 carries the strict
//! version and type in its low bytes; a non-negative one is the legacy
//! name-length-first form.

use crate::error::ProtocolError;
use crate::message::{Message, MessageType};
use crate::options::ProtocolOptions;
use crate::ttype::{self, TType};
use crate::value::Value;
use crate::wire::{replicate, Builder, Getter};
use bytes::Bytes;
use std::collections::BTreeMap;

/// Version word of the strict message header. The sign bit distinguishes
/// strict from legacy framing on decode.
pub const STRICT_VERSION: u32 = 0x8001_0000;

const VERSION_MASK: u32 = 0x7fff_0000;
const TYPE_MASK: u32 = 0x0000_00ff;

/// Encodes a single value.
pub fn encode_value(value: &Value) -> Result<Bytes, ProtocolError> {
    let mut b = Builder::new();
    write_value(&mut b, value)?;
    Ok(b.freeze())
}

/// Decodes a single value of the given type. Leftover bytes are permitted.
pub fn decode_value(
    ttype: TType,
    bytes: &[u8],
    options: &ProtocolOptions,
) -> Result<Value, ProtocolError> {
    read_value(&mut Getter::new(bytes), ttype, options)
}

/// Encodes a message with the strict framing.
pub fn encode_message(message: &Message) -> Result<Bytes, ProtocolError> {
    let mut b = Builder::new();
    write_message(&mut b, message)?;
    Ok(b.freeze())
}

/// Decodes a message in either framing. Leftover bytes are permitted.
pub fn decode_message(bytes: &[u8], options: &ProtocolOptions) -> Result<Message, ProtocolError> {
    read_message(&mut Getter::new(bytes), options)
}

pub(crate) fn write_message(b: &mut Builder, message: &Message) -> Result<(), ProtocolError> {
    if message.payload.ttype() != TType::Struct {
        return Err(ProtocolError::ValueTypeMismatch {
            declared: TType::Struct,
            found: message.payload.ttype(),
        });
    }
    b.put_i32((STRICT_VERSION | message.ty.wire_code() as u32) as i32);
    let name = message.name.as_bytes();
    b.put_i32(checked_i32("method name", name.len())?);
    b.put_slice(name);
    b.put_i32(message.seqid);
    write_value(b, &message.payload)
}

pub(crate) fn read_message(
    g: &mut Getter<'_>,
    options: &ProtocolOptions,
) -> Result<Message, ProtocolError> {
    let head = g.i32()?;
    let (name, ty) = if head < 0 {
        // Strict: version and type packed into the leading word.
        let head = head as u32;
        if (head & VERSION_MASK) >> 16 != 1 {
            return Err(ProtocolError::BadVersion(head));
        }
        let ty = MessageType::from_wire_code((head & TYPE_MASK) as u8)?;
        let declared = g.i32()?;
        let name = read_method_name(g, declared, options)?;
        (name, ty)
    } else {
        // Legacy: the leading word is the name length itself.
        let name = read_method_name(g, head, options)?;
        let ty = MessageType::from_wire_code(g.i8()? as u8)?;
        (name, ty)
    };
    let seqid = g.i32()?;
    let payload = read_value(g, TType::Struct, options)?;
    Ok(Message {
        name,
        ty,
        seqid,
        payload,
    })
}

fn read_method_name(
    g: &mut Getter<'_>,
    declared: i32,
    options: &ProtocolOptions,
) -> Result<String, ProtocolError> {
    let len = checked_len("method name", declared, options.max_method_name_length)?;
    options.parse_method_name(g.take(len)?)
}

fn write_value(b: &mut Builder, value: &Value) -> Result<(), ProtocolError> {
    match value {
        Value::Bool(v) => b.put_i8(*v as i8),
        Value::Byte(v) => b.put_i8(*v),
        Value::Double(v) => b.put_f64(*v),
        Value::Int16(v) => b.put_i16(*v),
        Value::Int32(v) => b.put_i32(*v),
        Value::Int64(v) => b.put_i64(*v),
        Value::Binary(v) => {
            b.put_i32(checked_i32("binary", v.len())?);
            b.put_slice(v);
        }
        Value::Struct(fields) => {
            for (id, field) in fields {
                b.put_u8(field.ttype().wire_code());
                b.put_i16(*id);
                write_value(b, field)?;
            }
            b.put_u8(ttype::STOP);
        }
        Value::List(elem, items) => write_sequence(b, *elem, items)?,
        Value::Set(elem, items) => write_sequence(b, *elem, items)?,
        Value::Map(key, val, entries) => {
            b.put_u8(key.wire_code());
            b.put_u8(val.wire_code());
            b.put_i32(checked_i32("map", entries.len())?);
            for (k, v) in entries {
                check_homogeneous(*key, k)?;
                check_homogeneous(*val, v)?;
                write_value(b, k)?;
                write_value(b, v)?;
            }
        }
    }
    Ok(())
}

// Sets encode identically to lists; uniqueness is the caller's contract.
fn write_sequence(b: &mut Builder, elem: TType, items: &[Value]) -> Result<(), ProtocolError> {
    b.put_u8(elem.wire_code());
    b.put_i32(checked_i32("list", items.len())?);
    for item in items {
        check_homogeneous(elem, item)?;
        write_value(b, item)?;
    }
    Ok(())
}

fn check_homogeneous(declared: TType, value: &Value) -> Result<(), ProtocolError> {
    if value.ttype() != declared {
        return Err(ProtocolError::ValueTypeMismatch {
            declared,
            found: value.ttype(),
        });
    }
    Ok(())
}

fn read_value(
    g: &mut Getter<'_>,
    ttype: TType,
    options: &ProtocolOptions,
) -> Result<Value, ProtocolError> {
    match ttype {
        TType::Bool => Ok(Value::Bool(g.i8()? != 0)),
        TType::Byte => Ok(Value::Byte(g.i8()?)),
        TType::Double => Ok(Value::Double(g.f64()?)),
        TType::Int16 => Ok(Value::Int16(g.i16()?)),
        TType::Int32 => Ok(Value::Int32(g.i32()?)),
        TType::Int64 => Ok(Value::Int64(g.i64()?)),
        TType::Binary => {
            let len = checked_len("binary", g.i32()?, options.max_binary_length)?;
            Ok(Value::Binary(Bytes::copy_from_slice(g.take(len)?)))
        }
        TType::Struct => read_struct(g, options),
        TType::List => {
            let (elem, items) = read_sequence(g, "list", options.max_list_length, options)?;
            Ok(Value::List(elem, items))
        }
        TType::Set => {
            let (elem, items) = read_sequence(g, "set", options.max_set_size, options)?;
            Ok(Value::Set(elem, items))
        }
        TType::Map => {
            let key = TType::from_wire_code(g.u8()?)?;
            let val = TType::from_wire_code(g.u8()?)?;
            let count = checked_len("map", g.i32()?, options.max_map_size)?;
            let entries = replicate(count, || {
                let k = read_value(g, key, options)?;
                let v = read_value(g, val, options)?;
                Ok((k, v))
            })?;
            Ok(Value::Map(key, val, entries))
        }
    }
}

fn read_sequence(
    g: &mut Getter<'_>,
    field: &'static str,
    cap: usize,
    options: &ProtocolOptions,
) -> Result<(TType, Vec<Value>), ProtocolError> {
    let elem = TType::from_wire_code(g.u8()?)?;
    let count = checked_len(field, g.i32()?, cap)?;
    let items = replicate(count, || read_value(g, elem, options))?;
    Ok((elem, items))
}

fn read_struct(g: &mut Getter<'_>, options: &ProtocolOptions) -> Result<Value, ProtocolError> {
    let mut fields = BTreeMap::new();
    loop {
        let code = g.u8()?;
        if code == ttype::STOP {
            return Ok(Value::Struct(fields));
        }
        let ttype = TType::from_wire_code(code)?;
        let id = g.i16()?;
        let value = read_value(g, ttype, options)?;
        // Duplicate field ids: last occurrence wins.
        fields.insert(id, value);
    }
}

fn checked_len(field: &'static str, declared: i32, cap: usize) -> Result<usize, ProtocolError> {
    if declared < 0 {
        return Err(ProtocolError::NegativeSize { field });
    }
    let len = declared as usize;
    if len > cap {
        return Err(ProtocolError::LimitExceeded {
            field,
            value: declared as i64,
            cap,
        });
    }
    Ok(len)
}

fn checked_i32(field: &'static str, len: usize) -> Result<i32, ProtocolError> {
    i32::try_from(len).map_err(|_| ProtocolError::LimitExceeded {
        field,
        value: len as i64,
        cap: i32::MAX as usize,
    })
}
