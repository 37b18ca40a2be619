//! Little-endian cursor primitives shared by every message layout.

use super::half::{f16_to_f32, f32_to_f16};

/// Longest text field a one-byte length prefix can describe.
pub const MAX_TEXT_UNITS: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The body ended before the layout did.
    Truncated { needed: usize, remaining: usize },
    UnknownType(u16),
    InvalidEnumValue { field: &'static str, value: u8 },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Truncated { needed, remaining } => write!(
                f,
                "Truncated message: needed {} more bytes, {} remaining",
                needed, remaining
            ),
            DecodeError::UnknownType(tag) => write!(f, "Unknown message type {}", tag),
            DecodeError::InvalidEnumValue { field, value } => {
                write!(f, "Invalid value {} for {}", value, field)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Reads fields front to back, never past the end of `buf`.
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn bool(&mut self) -> Result<bool, DecodeError> {
        Ok(self.u8()? != 0)
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn i16(&mut self) -> Result<i16, DecodeError> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn f16(&mut self) -> Result<f32, DecodeError> {
        Ok(f16_to_f32(self.u16()?))
    }

    pub fn vec3(&mut self) -> Result<[f32; 3], DecodeError> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    /// One-byte count followed by Latin-1 code units.
    pub fn narrow_string(&mut self) -> Result<String, DecodeError> {
        let len = self.u8()? as usize;
        Ok(self.take(len)?.iter().map(|&b| b as char).collect())
    }

    /// One-byte count followed by UTF-16LE code units.
    pub fn wide_string(&mut self) -> Result<String, DecodeError> {
        let len = self.u8()? as usize;
        let bytes = self.take(len * 2)?;
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Appends fields to a growable buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn i16(&mut self, v: i16) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_le_bytes())
    }

    pub fn f16(&mut self, v: f32) -> &mut Self {
        self.u16(f32_to_f16(v))
    }

    pub fn vec3(&mut self, v: [f32; 3]) -> &mut Self {
        self.f32(v[0]).f32(v[1]).f32(v[2])
    }

    /// Characters outside Latin-1 become `?`.
    pub fn narrow_string(&mut self, s: &str) -> &mut Self {
        let units: Vec<u8> = s
            .chars()
            .take(MAX_TEXT_UNITS)
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        self.u8(units.len() as u8).bytes(&units)
    }

    pub fn wide_string(&mut self, s: &str) -> &mut Self {
        let units: Vec<u16> = s.encode_utf16().take(MAX_TEXT_UNITS).collect();
        self.u8(units.len() as u8);
        for unit in units {
            self.u16(unit);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerics_are_little_endian() {
        let mut w = Writer::new();
        w.u16(0x0102).u32(0x03040506).i16(-2);
        assert_eq!(w.into_bytes(), vec![0x02, 0x01, 0x06, 0x05, 0x04, 0x03, 0xfe, 0xff]);
    }

    #[test]
    fn reader_reports_truncation() {
        let mut r = Reader::new(&[1, 2, 3]);
        assert_eq!(r.u16().unwrap(), 0x0201);
        assert_eq!(
            r.u32(),
            Err(DecodeError::Truncated {
                needed: 4,
                remaining: 1
            })
        );
        // A failed read consumes nothing.
        assert_eq!(r.u8().unwrap(), 3);
    }

    #[test]
    fn narrow_string_is_latin1() {
        let mut w = Writer::new();
        w.narrow_string("ks_nürburgring");
        let bytes = w.into_bytes();
        assert_eq!(bytes[0], 14);
        assert_eq!(bytes[5], 0xfc);
        assert_eq!(Reader::new(&bytes).narrow_string().unwrap(), "ks_nürburgring");
    }

    #[test]
    fn narrow_string_replaces_wide_chars() {
        let mut w = Writer::new();
        w.narrow_string("a€b");
        assert_eq!(w.into_bytes(), vec![3, b'a', b'?', b'b']);
    }

    #[test]
    fn wide_string_is_utf16() {
        let mut w = Writer::new();
        w.wide_string("Zoë 🏁");
        let bytes = w.into_bytes();
        // The flag is a surrogate pair.
        assert_eq!(bytes[0], 6);
        assert_eq!(bytes.len(), 1 + 12);
        assert_eq!(&bytes[1..3], &[b'Z', 0]);
        assert_eq!(Reader::new(&bytes).wide_string().unwrap(), "Zoë 🏁");
    }

    #[test]
    fn long_text_is_truncated() {
        let long = "x".repeat(300);
        let mut w = Writer::new();
        w.narrow_string(&long).wide_string(&long);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 1 + 255 + 1 + 510);
        let mut r = Reader::new(&bytes);
        assert_eq!(r.narrow_string().unwrap().len(), 255);
        assert_eq!(r.wide_string().unwrap().len(), 255);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn string_length_past_end_is_truncated_error() {
        let err = Reader::new(&[5, b'a', b'b']).narrow_string().unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                needed: 5,
                remaining: 2
            }
        );
        assert!(Reader::new(&[2, 0x41, 0x00]).wide_string().is_err());
    }

    #[test]
    fn half_fields_use_binary16() {
        let mut w = Writer::new();
        w.f16(1.0);
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0x00, 0x3c]);
        assert_eq!(Reader::new(&bytes).f16().unwrap(), 1.0);
    }
}
