//! Length-prefixed framing and incremental message decoding.
//!
//! Framed layout:
//!
//! ```text
//! +-------------+------------------+
//! | len: i32-BE | body: len bytes  |
//! +-------------+------------------+
//! ```
//!
//! The frame length is checked against the configured cap before any body
//! bytes are retained. The unframed transport is the raw message stream.

use crate::binary;
use crate::error::ProtocolError;
use crate::message::Message;
use crate::options::ProtocolOptions;
use crate::wire::Getter;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the frame length prefix in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// How messages are delimited on the byte channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Each message is prefixed with its length as a big-endian i32.
    #[default]
    Framed,
    /// Messages are written back to back with no delimiter.
    Unframed,
}

/// Prefixes a message body with its length.
pub fn encode_frame(body: &[u8], max: usize) -> Result<BytesMut, ProtocolError> {
    if body.len() > max {
        return Err(ProtocolError::LimitExceeded {
            field: "frame",
            value: body.len() as i64,
            cap: max,
        });
    }
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + body.len());
    buf.put_i32(body.len() as i32);
    buf.put_slice(body);
    Ok(buf)
}

/// Splits one complete frame body off the front of `buf`.
///
/// Returns `Ok(None)` until a full frame is buffered. Negative and
/// over-cap lengths are rejected before the body is awaited.
pub fn try_split_frame(buf: &mut BytesMut, max: usize) -> Result<Option<Bytes>, ProtocolError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Ok(None);
    }
    let declared = i32::from_be_bytes(buf[0..FRAME_HEADER_SIZE].try_into().unwrap());
    if declared < 0 {
        return Err(ProtocolError::NegativeSize { field: "frame" });
    }
    let len = declared as usize;
    if len > max {
        return Err(ProtocolError::LimitExceeded {
            field: "frame",
            value: declared as i64,
            cap: max,
        });
    }
    if buf.len() < FRAME_HEADER_SIZE + len {
        return Ok(None);
    }
    buf.advance(FRAME_HEADER_SIZE);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Serializes a message for the given transport.
pub fn frame_message(
    message: &Message,
    transport: Transport,
    options: &ProtocolOptions,
) -> Result<Bytes, ProtocolError> {
    let body = binary::encode_message(message)?;
    match transport {
        Transport::Framed => Ok(encode_frame(&body, options.max_frame_length)?.freeze()),
        Transport::Unframed => Ok(body),
    }
}

/// Incremental message decoder: feed bytes in, take messages out.
///
/// In framed mode a message is decoded only once its whole frame has
/// arrived; a message that fails to decode inside a complete frame is a
/// hard error. In unframed mode a short read simply means "not yet".
#[derive(Debug)]
pub struct MessageDecoder {
    buffer: BytesMut,
    transport: Transport,
    options: ProtocolOptions,
}

impl MessageDecoder {
    pub fn new(transport: Transport, options: ProtocolOptions) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            transport,
            options,
        }
    }

    /// Appends raw bytes from the channel.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Attempts to decode the next message from the buffer.
    pub fn decode_message(&mut self) -> Result<Option<Message>, ProtocolError> {
        match self.transport {
            Transport::Framed => {
                match try_split_frame(&mut self.buffer, self.options.max_frame_length)? {
                    Some(frame) => binary::decode_message(&frame, &self.options).map(Some),
                    None => Ok(None),
                }
            }
            Transport::Unframed => {
                let (message, consumed) = {
                    let mut g = Getter::new(&self.buffer);
                    match binary::read_message(&mut g, &self.options) {
                        Ok(message) => (message, g.position()),
                        Err(ProtocolError::UnexpectedEof { .. }) => return Ok(None),
                        Err(e) => return Err(e),
                    }
                };
                self.buffer.advance(consumed);
                Ok(Some(message))
            }
        }
    }
}
