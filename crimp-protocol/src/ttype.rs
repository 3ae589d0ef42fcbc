//! Thrift runtime type tags.

use crate::error::ProtocolError;
use std::fmt;

/// Wire code that terminates a struct's field list. Never tags a value.
pub const STOP: u8 = 0;

/// Runtime type tag of a Thrift value.
///
/// Every value on the wire is preceded (directly or via a container header)
/// by one of these one-byte codes. Codes outside the set below are reserved
/// and rejected on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TType {
    Bool,
    Byte,
    Double,
    Int16,
    Int32,
    Int64,
    Binary,
    Struct,
    Map,
    Set,
    List,
}

impl TType {
    /// The Binary Protocol code for this tag.
    pub fn wire_code(self) -> u8 {
        match self {
            TType::Bool => 2,
            TType::Byte => 3,
            TType::Double => 4,
            TType::Int16 => 6,
            TType::Int32 => 8,
            TType::Int64 => 10,
            TType::Binary => 11,
            TType::Struct => 12,
            TType::Map => 13,
            TType::Set => 14,
            TType::List => 15,
        }
    }

    /// Maps a wire code back to a tag.
    pub fn from_wire_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            2 => Ok(TType::Bool),
            3 => Ok(TType::Byte),
            4 => Ok(TType::Double),
            6 => Ok(TType::Int16),
            8 => Ok(TType::Int32),
            10 => Ok(TType::Int64),
            11 => Ok(TType::Binary),
            12 => Ok(TType::Struct),
            13 => Ok(TType::Map),
            14 => Ok(TType::Set),
            15 => Ok(TType::List),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

impl fmt::Display for TType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TType::Bool => "bool",
            TType::Byte => "byte",
            TType::Double => "double",
            TType::Int16 => "i16",
            TType::Int32 => "i32",
            TType::Int64 => "i64",
            TType::Binary => "binary",
            TType::Struct => "struct",
            TType::Map => "map",
            TType::Set => "set",
            TType::List => "list",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TType; 11] = [
        TType::Bool,
        TType::Byte,
        TType::Double,
        TType::Int16,
        TType::Int32,
        TType::Int64,
        TType::Binary,
        TType::Struct,
        TType::Map,
        TType::Set,
        TType::List,
    ];

    #[test]
    fn test_wire_code_roundtrip() {
        for ttype in ALL {
            assert_eq!(TType::from_wire_code(ttype.wire_code()).unwrap(), ttype);
        }
    }

    #[test]
    fn test_assigned_codes() {
        assert_eq!(TType::Bool.wire_code(), 2);
        assert_eq!(TType::Byte.wire_code(), 3);
        assert_eq!(TType::Double.wire_code(), 4);
        assert_eq!(TType::Int16.wire_code(), 6);
        assert_eq!(TType::Int32.wire_code(), 8);
        assert_eq!(TType::Int64.wire_code(), 10);
        assert_eq!(TType::Binary.wire_code(), 11);
        assert_eq!(TType::Struct.wire_code(), 12);
        assert_eq!(TType::Map.wire_code(), 13);
        assert_eq!(TType::Set.wire_code(), 14);
        assert_eq!(TType::List.wire_code(), 15);
    }

    #[test]
    fn test_reserved_codes_rejected() {
        for code in [0u8, 1, 5, 7, 9, 16, 17, 0x7f, 0xff] {
            assert!(matches!(
                TType::from_wire_code(code),
                Err(ProtocolError::UnknownType(c)) if c == code
            ));
        }
    }
}
