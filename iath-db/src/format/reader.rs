//! Bounds-checked cursor over a decompressed tile buffer.
//!
//! Every read that would run past the end yields `CorruptTile` rather than
//! panicking.

use crate::error::{Result, TileDbError};

pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(TileDbError::corrupt_tile(format!(
                "truncated buffer: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Take up to `len` bytes, fewer if the buffer ends first.
    pub(crate) fn take_up_to(&mut self, len: usize) -> &'a [u8] {
        let len = len.min(self.remaining());
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        out
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(out))
    }

    pub(crate) fn read_f32_le(&mut self) -> Result<f32> {
        let mut out = [0u8; 4];
        out.copy_from_slice(self.take(4)?);
        Ok(f32::from_le_bytes(out))
    }

    /// A `u32` length prefix followed by that many bytes.
    pub(crate) fn read_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32_le()? as usize;
        self.take(len)
    }

    /// UTF-8 string terminated by a NUL byte (terminator consumed).
    pub(crate) fn read_cstr(&mut self) -> Result<&'a str> {
        let rest = &self.buf[self.pos..];
        let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            TileDbError::corrupt_tile(format!("unterminated string at offset {}", self.pos))
        })?;
        let s = utf8(&rest[..end])?;
        self.pos += end + 1;
        Ok(s)
    }
}

pub(crate) fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| TileDbError::corrupt_tile(format!("invalid UTF-8: {e}")))
}
