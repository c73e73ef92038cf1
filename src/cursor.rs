//! Position-tracked binary reader/writer over an in-memory buffer
//!
//! All numeric traffic is little-endian. Reads are bounds-checked and fail
//! with [`Error::UnexpectedEnd`] instead of returning garbage; writes append
//! at the end of the buffer and advance the position by exactly the bytes
//! written. Fixed-slot string writes zero-pad short strings and refuse long
//! ones with [`Error::StringTooLong`].

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use encoding_rs::Encoding;

use crate::error::{Error, Result};

/// Typed cursor over a growable byte buffer.
///
/// The cursor has no knowledge of any schema; it only moves a position and
/// converts bytes.
#[derive(Debug, Default)]
pub struct BinaryCursor {
    buf: Vec<u8>,
    pos: usize,
}

impl BinaryCursor {
    /// Create an empty cursor for writing.
    pub fn new() -> Self {
        BinaryCursor::default()
    }

    /// Wrap an existing buffer for reading, position at the start.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        BinaryCursor { buf, pos: 0 }
    }

    /// Current read/write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume the cursor and return the underlying buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Take `n` bytes at the position, advancing past them.
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEnd {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    // Reads

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        let mut s = self.take(2)?;
        Ok(s.read_i16::<LittleEndian>()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut s = self.take(2)?;
        Ok(s.read_u16::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let mut s = self.take(4)?;
        Ok(s.read_i32::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut s = self.take(4)?;
        Ok(s.read_u32::<LittleEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut s = self.take(8)?;
        Ok(s.read_i64::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut s = self.take(4)?;
        Ok(s.read_f32::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut s = self.take(8)?;
        Ok(s.read_f64::<LittleEndian>()?)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// Read a fixed `n`-byte string slot: trim at the first zero byte and
    /// decode the prefix with `encoding`.
    pub fn read_string(&mut self, n: usize, encoding: &'static Encoding) -> Result<String> {
        let raw = self.take(n)?;
        let text = match raw.iter().position(|&b| b == 0) {
            Some(end) => &raw[..end],
            None => raw,
        };
        let (decoded, _, _) = encoding.decode(text);
        Ok(decoded.into_owned())
    }

    // Writes

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.buf.write_u8(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.buf.write_i16::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.buf.write_u16::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.buf.write_i32::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.buf.write_u32::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.buf.write_i64::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.buf.write_f32::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.buf.write_f64::<LittleEndian>(v)?;
        self.pos = self.buf.len();
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        self.pos = self.buf.len();
        Ok(())
    }

    /// Write a string into a fixed `slot`-byte slot, right-padded with zero
    /// bytes. A string that encodes longer than the slot is an error, never
    /// a silent truncation.
    pub fn write_string(
        &mut self,
        s: &str,
        slot: usize,
        encoding: &'static Encoding,
    ) -> Result<()> {
        let (encoded, _, _) = encoding.encode(s);
        if encoded.len() > slot {
            return Err(Error::StringTooLong {
                len: encoded.len(),
                max: slot,
            });
        }
        self.buf.extend_from_slice(&encoded);
        self.buf.resize(self.buf.len() + (slot - encoded.len()), 0);
        self.pos = self.buf.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    #[test]
    fn test_numeric_round_trip() {
        let mut w = BinaryCursor::new();
        w.write_u8(0xFF).unwrap();
        w.write_i16(i16::MIN).unwrap();
        w.write_u16(u16::MAX).unwrap();
        w.write_i32(i32::MIN).unwrap();
        w.write_u32(u32::MAX).unwrap();
        w.write_i64(i64::MAX).unwrap();
        w.write_f32(1.5).unwrap();
        w.write_f64(-2.25).unwrap();

        let mut r = BinaryCursor::from_bytes(w.into_bytes());
        assert_eq!(r.read_u8().unwrap(), 0xFF);
        assert_eq!(r.read_i16().unwrap(), i16::MIN);
        assert_eq!(r.read_u16().unwrap(), u16::MAX);
        assert_eq!(r.read_i32().unwrap(), i32::MIN);
        assert_eq!(r.read_u32().unwrap(), u32::MAX);
        assert_eq!(r.read_i64().unwrap(), i64::MAX);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_f64().unwrap(), -2.25);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_read_past_end() {
        let mut r = BinaryCursor::from_bytes(vec![1, 2]);
        match r.read_i32() {
            Err(Error::UnexpectedEnd { needed: 4, remaining: 2 }) => {}
            other => panic!("expected UnexpectedEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_string_slot_pads_with_zeros() {
        let mut w = BinaryCursor::new();
        w.write_string("abc", 6, UTF_8).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, b"abc\0\0\0");

        let mut r = BinaryCursor::from_bytes(bytes);
        assert_eq!(r.read_string(6, UTF_8).unwrap(), "abc");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_string_longer_than_slot_is_rejected() {
        let mut w = BinaryCursor::new();
        match w.write_string("too long", 4, UTF_8) {
            Err(Error::StringTooLong { len: 8, max: 4 }) => {}
            other => panic!("expected StringTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_string_slot() {
        let mut w = BinaryCursor::new();
        w.write_string("", 4, UTF_8).unwrap();
        let mut r = BinaryCursor::from_bytes(w.into_bytes());
        assert_eq!(r.read_string(4, UTF_8).unwrap(), "");
    }

    #[test]
    fn test_write_advances_position_exactly() {
        let mut w = BinaryCursor::new();
        w.write_i32(7).unwrap();
        assert_eq!(w.position(), 4);
        w.write_bytes(&[0; 3]).unwrap();
        assert_eq!(w.position(), 7);
    }
}
