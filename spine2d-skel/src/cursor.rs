//! Primitive big-endian reads and writes shared by the decoder and encoder.

use crate::{ArenaStr, Error, StringArena};
use byteorder::{BigEndian, ByteOrder};

/// Sequential reader over an in-memory `.skel` buffer.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Moves back to a position previously returned by [`ByteCursor::position`].
    pub fn seek(&mut self, position: usize) -> Result<(), Error> {
        if position > self.bytes.len() {
            return Err(Error::UnexpectedEof {
                offset: position,
                needed: 0,
                remaining: 0,
            });
        }
        self.cursor = position;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    pub fn is_at_end(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::UnexpectedEof {
                offset: self.cursor,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), Error> {
        self.take(n).map(|_| ())
    }

    /// Fails early when `count` items of at least `min_bytes` each cannot fit in the rest of
    /// the buffer, so corrupt counts never turn into huge allocations.
    pub fn ensure_available(&self, count: usize, min_bytes: usize) -> Result<(), Error> {
        let needed = count.saturating_mul(min_bytes);
        if needed > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.cursor,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_bits(self.read_i32()? as u32))
    }

    pub fn read_varint(&mut self, optimize_positive: bool) -> Result<i32, Error> {
        let mut b = self.read_u8()?;
        let mut value: u32 = (b & 0x7F) as u32;
        if (b & 0x80) != 0 {
            b = self.read_u8()?;
            value |= ((b & 0x7F) as u32) << 7;
            if (b & 0x80) != 0 {
                b = self.read_u8()?;
                value |= ((b & 0x7F) as u32) << 14;
                if (b & 0x80) != 0 {
                    b = self.read_u8()?;
                    value |= ((b & 0x7F) as u32) << 21;
                    if (b & 0x80) != 0 {
                        b = self.read_u8()?;
                        value |= ((b & 0x7F) as u32) << 28;
                    }
                }
            }
        }

        if optimize_positive {
            Ok(value as i32)
        } else {
            Ok((value >> 1) as i32 ^ -((value & 1) as i32))
        }
    }

    /// Reads a non-negative varint used as a count or index.
    pub fn read_count(&mut self) -> Result<usize, Error> {
        let offset = self.cursor;
        let value = self.read_varint(true)?;
        usize::try_from(value).map_err(|_| Error::InvalidValue {
            message: format!("negative count {value} at offset {offset}"),
        })
    }

    /// Reads a `byteCountPlusOne`-prefixed string into `arena`.
    ///
    /// `Ok(None)` is the null string; an empty run yields an empty (non-null) string.
    pub fn read_string(&mut self, arena: &mut StringArena) -> Result<Option<ArenaStr>, Error> {
        let length = self.read_count()?;
        if length == 0 {
            return Ok(None);
        }
        let offset = self.cursor;
        let bytes = self.take(length - 1)?;
        arena
            .push_encoded(bytes)
            .map(Some)
            .map_err(|message| Error::InvalidString { offset, message })
    }

    pub fn read_color(&mut self) -> Result<[f32; 4], Error> {
        let rgba = self.take(4)?;
        Ok([
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        ])
    }
}

/// Growable writer producing the same primitives [`ByteCursor`] reads.
#[derive(Clone, Debug, Default)]
pub struct ByteWriter {
    out: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }

    pub fn write_u8(&mut self, value: u8) {
        self.out.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.out.push(value as u8);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.out.push(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, value);
        self.out.extend_from_slice(&buf);
    }

    pub fn write_i32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, value);
        self.out.extend_from_slice(&buf);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_i32(value.to_bits() as i32);
    }

    pub fn write_varint(&mut self, value: i32, optimize_positive: bool) {
        let mut value = if optimize_positive {
            value as u32
        } else {
            ((value << 1) ^ (value >> 31)) as u32
        };
        loop {
            if (value & !0x7F) == 0 {
                self.out.push(value as u8);
                return;
            }
            self.out.push(((value & 0x7F) | 0x80) as u8);
            value >>= 7;
        }
    }

    /// Writes a count or index as an unsigned varint.
    pub fn write_count(&mut self, value: usize) -> Result<(), Error> {
        let value = i32::try_from(value).map_err(|_| Error::InvalidDocument {
            message: format!("count {value} does not fit the varint range"),
        })?;
        self.write_varint(value, true);
        Ok(())
    }

    /// Writes `byteCountPlusOne` then the raw UTF-8 bytes; no multi-byte transformation.
    pub fn write_string(&mut self, value: Option<&str>) -> Result<(), Error> {
        match value {
            None => self.write_varint(0, true),
            Some(s) => {
                self.write_count(s.len() + 1)?;
                self.out.extend_from_slice(s.as_bytes());
            }
        }
        Ok(())
    }

    pub fn write_color(&mut self, color: [f32; 4]) {
        for c in color {
            self.out.push((c.clamp(0.0, 1.0) * 255.0).round() as u8);
        }
    }
}
