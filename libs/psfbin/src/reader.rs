//! Big-endian primitive reads over an in-memory PSF image.

use crate::ast::PsfString;
use crate::error::{Error, Result};

pub(crate) const WORD_SIZE: usize = 4;

/// A forward cursor over the raw file bytes.
///
/// All multi-byte reads are big-endian. The cursor tracks its absolute
/// offset so section end positions can be checked against it, and supports
/// one-word rewind for the tag-sentinel loops used throughout the format.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The number of bytes consumed from the beginning of the file.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::UnexpectedEof { offset: self.pos });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(WORD_SIZE)?.try_into().unwrap()))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    /// Reads a full word and keeps only its low byte.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(WORD_SIZE)?[WORD_SIZE - 1] as i8)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Reads a length-prefixed string and its word-alignment padding.
    ///
    /// The total stream advance is always a multiple of the word size.
    /// Payload bytes are preserved unchanged; PSF strings are not
    /// guaranteed to be UTF-8.
    pub fn read_string(&mut self) -> Result<PsfString> {
        let len = self.read_u32()? as usize;
        let payload = self.take(len)?.to_vec();
        self.take(padding(len))?;
        Ok(PsfString::from(payload))
    }

    /// Consumes exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn peek_u32(&self) -> Result<u32> {
        if self.remaining() < WORD_SIZE {
            return Err(Error::UnexpectedEof { offset: self.pos });
        }
        let bytes = &self.data[self.pos..self.pos + WORD_SIZE];
        Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
    }

    /// Rewinds the cursor by one word. Supports one-word lookahead only.
    pub fn unread_u32(&mut self) {
        debug_assert!(self.pos >= WORD_SIZE);
        self.pos -= WORD_SIZE;
    }

    /// Consumes the next word if it equals `tag`.
    ///
    /// This is the try-decode-or-rewind step shared by every sentinel-
    /// terminated record loop in the format. Returns `false` on a tag
    /// mismatch or when fewer than four bytes remain, leaving the cursor
    /// untouched in both cases.
    pub fn try_tag(&mut self, tag: u32) -> Result<bool> {
        if self.remaining() < WORD_SIZE {
            return Ok(false);
        }
        if self.peek_u32()? == tag {
            self.pos += WORD_SIZE;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Bytes of padding after a string payload of length `len`.
#[inline]
fn padding(len: usize) -> usize {
    (WORD_SIZE - len % WORD_SIZE) % WORD_SIZE
}
