//! RPC message envelope.

use crate::error::ProtocolError;
use crate::value::Value;
use std::fmt;

/// Kind of an RPC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Call,
    Reply,
    Exception,
    Oneway,
}

impl MessageType {
    pub fn wire_code(self) -> u8 {
        match self {
            MessageType::Call => 1,
            MessageType::Reply => 2,
            MessageType::Exception => 3,
            MessageType::Oneway => 4,
        }
    }

    pub fn from_wire_code(code: u8) -> Result<Self, ProtocolError> {
        match code {
            1 => Ok(MessageType::Call),
            2 => Ok(MessageType::Reply),
            3 => Ok(MessageType::Exception),
            4 => Ok(MessageType::Oneway),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Call => "call",
            MessageType::Reply => "reply",
            MessageType::Exception => "exception",
            MessageType::Oneway => "oneway",
        };
        f.write_str(name)
    }
}

/// One RPC message: method name, kind, correlation id, struct payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub ty: MessageType,
    pub seqid: i32,
    pub payload: Value,
}

impl Message {
    pub fn new(name: impl Into<String>, ty: MessageType, seqid: i32, payload: Value) -> Self {
        Self {
            name: name.into(),
            ty,
            seqid,
            payload,
        }
    }

    pub fn call(name: impl Into<String>, seqid: i32, payload: Value) -> Self {
        Self::new(name, MessageType::Call, seqid, payload)
    }

    pub fn reply(name: impl Into<String>, seqid: i32, payload: Value) -> Self {
        Self::new(name, MessageType::Reply, seqid, payload)
    }

    pub fn exception(name: impl Into<String>, seqid: i32, payload: Value) -> Self {
        Self::new(name, MessageType::Exception, seqid, payload)
    }

    pub fn oneway(name: impl Into<String>, seqid: i32, payload: Value) -> Self {
        Self::new(name, MessageType::Oneway, seqid, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_codes() {
        for (ty, code) in [
            (MessageType::Call, 1u8),
            (MessageType::Reply, 2),
            (MessageType::Exception, 3),
            (MessageType::Oneway, 4),
        ] {
            assert_eq!(ty.wire_code(), code);
            assert_eq!(MessageType::from_wire_code(code).unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_message_type() {
        assert_eq!(
            MessageType::from_wire_code(0),
            Err(ProtocolError::UnknownMessageType(0))
        );
        assert_eq!(
            MessageType::from_wire_code(5),
            Err(ProtocolError::UnknownMessageType(5))
        );
    }
}
