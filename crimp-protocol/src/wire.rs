//! Big-endian byte emission and positional decoding primitives.

use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Accumulates wire bytes with amortized O(1) append.
///
/// All multi-byte integers are emitted big-endian; doubles are IEEE-754
/// big-endian. An empty builder is the identity of [`Builder::append`].
#[derive(Debug, Default)]
pub struct Builder {
    buf: BytesMut,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    pub fn put_i16(&mut self, v: i16) {
        self.buf.put_i16(v);
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    pub fn put_slice(&mut self, v: &[u8]) {
        self.buf.put_slice(v);
    }

    /// Concatenates another builder onto this one.
    pub fn append(&mut self, other: Builder) {
        self.buf.unsplit(other.buf);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finalizes into an immutable byte sequence.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Positional reader over a byte slice.
///
/// Every primitive fails with [`ProtocolError::UnexpectedEof`] when the
/// slice is shorter than requested; nothing is consumed on failure.
#[derive(Debug)]
pub struct Getter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Getter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn need(&self, n: usize) -> Result<(), ProtocolError> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(ProtocolError::UnexpectedEof {
                needed: n - remaining,
            });
        }
        Ok(())
    }

    /// Reads exactly `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.need(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn i16(&mut self) -> Result<i16, ProtocolError> {
        Ok(i16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }
}

/// Initial capacity clamp for count-prefixed decodes. A peer can declare
/// any count up to the configured limit; elements are decoded one at a
/// time, so a lying count fails on the first missing element instead of
/// reserving the declared size.
const REPLICATE_PREALLOC: usize = 1024;

/// Runs a decode action `count` times, collecting the results.
pub fn replicate<T>(
    count: usize,
    mut action: impl FnMut() -> Result<T, ProtocolError>,
) -> Result<Vec<T>, ProtocolError> {
    let mut out = Vec::with_capacity(count.min(REPLICATE_PREALLOC));
    for _ in 0..count {
        out.push(action()?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_big_endian() {
        let mut b = Builder::new();
        b.put_i16(0x0102);
        b.put_i32(0x03040506);
        assert_eq!(&b.freeze()[..], &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);
    }

    #[test]
    fn test_builder_double() {
        let mut b = Builder::new();
        b.put_f64(1.0);
        assert_eq!(&b.freeze()[..], &1.0f64.to_be_bytes());
    }

    #[test]
    fn test_builder_append_identity() {
        let mut b = Builder::new();
        b.put_slice(b"abc");
        b.append(Builder::new());
        assert_eq!(&b.freeze()[..], b"abc");

        let mut empty = Builder::new();
        let mut rhs = Builder::new();
        rhs.put_slice(b"abc");
        empty.append(rhs);
        assert_eq!(&empty.freeze()[..], b"abc");
    }

    #[test]
    fn test_getter_primitives() {
        let data = [0x01, 0x00, 0x02, 0x80, 0x00, 0x00, 0x00];
        let mut g = Getter::new(&data);
        assert_eq!(g.i8().unwrap(), 1);
        assert_eq!(g.i16().unwrap(), 2);
        assert_eq!(g.i32().unwrap(), i32::MIN);
        assert_eq!(g.position(), 7);
        assert_eq!(g.remaining(), 0);
    }

    #[test]
    fn test_getter_short_input() {
        let mut g = Getter::new(&[0x00, 0x01]);
        assert_eq!(
            g.i32(),
            Err(ProtocolError::UnexpectedEof { needed: 2 })
        );
        // Nothing consumed on failure.
        assert_eq!(g.position(), 0);
        assert_eq!(g.i16().unwrap(), 1);
    }

    #[test]
    fn test_getter_take() {
        let mut g = Getter::new(b"hello");
        assert_eq!(g.take(5).unwrap(), b"hello");
        assert_eq!(g.take(1), Err(ProtocolError::UnexpectedEof { needed: 1 }));
    }

    #[test]
    fn test_replicate() {
        let mut n = 0i32;
        let out = replicate(4, || {
            n += 1;
            Ok(n)
        })
        .unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_replicate_short_circuits() {
        let mut n = 0u32;
        let result: Result<Vec<u32>, _> = replicate(10, || {
            n += 1;
            if n == 3 {
                Err(ProtocolError::UnexpectedEof { needed: 1 })
            } else {
                Ok(n)
            }
        });
        assert!(result.is_err());
        assert_eq!(n, 3);
    }
}
