//! A bounds-checked big-endian reader.

use crate::error::{Error, Result};
use crate::sfnt::types::Tag;
use bytes::Buf;

/// Reads big-endian scalars from a byte slice.
///
/// Every read checks the remaining length first and fails with [`Error::Truncated`] instead of panicking.
/// `what` names the structure being read and is reported in that error.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor at the start of `data`.
    pub fn new(data: &'a [u8], what: &'static str) -> Self {
        Cursor { data, pos: 0, what }
    }

    /// Creates a cursor at `pos` within `data`.
    ///
    /// Fails if `pos` lies past the end of `data`.
    pub fn at(data: &'a [u8], pos: usize, what: &'static str) -> Result<Self> {
        let mut cursor = Cursor::new(data, what);
        cursor.ensure(pos)?;
        cursor.pos = pos;
        Ok(cursor)
    }

    /// The current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The number of bytes after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::Truncated {
                what: self.what,
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn take<T>(&mut self, size: usize, read: impl FnOnce(&mut &'a [u8]) -> T) -> Result<T> {
        self.ensure(size)?;
        let data: &'a [u8] = self.data;
        let mut chunk = &data[self.pos..self.pos + size];
        self.pos += size;
        Ok(read(&mut chunk))
    }

    /// Advances by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n, |_| ())
    }

    /// Reads `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n, |chunk| *chunk)
    }

    /// Reads a `uint8`.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.take(1, |chunk| chunk.get_u8())
    }

    /// Reads a `uint16`.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.take(2, |chunk| chunk.get_u16())
    }

    /// Reads an `int16`.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.take(2, |chunk| chunk.get_i16())
    }

    /// Reads a `uint32`.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4, |chunk| chunk.get_u32())
    }

    /// Reads a 4-byte tag.
    pub fn read_tag(&mut self) -> Result<Tag> {
        let mut tag = [0; 4];
        tag.copy_from_slice(self.read_bytes(4)?);
        Ok(Tag(tag))
    }
}
