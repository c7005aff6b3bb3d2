use crate::{ClassError, ClassResult};
use byteorder::{BigEndian, ByteOrder};

/// A forward-only cursor over a borrowed byte buffer.
///
/// Every read either advances `offset` by exactly the width of the value it
/// decoded, or fails with [`ClassError::TruncatedInput`] and leaves the offset
/// untouched. There is no way to move the cursor backwards.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ByteParser<'src> {
    src: &'src [u8],
    offset: usize,
    end: usize,
}

impl<'src> ByteParser<'src> {
    pub fn new(src: &'src [u8]) -> Self {
        ByteParser {
            src,
            offset: 0,
            end: src.len(),
        }
    }

    /// Position in the original buffer, also for parsers made by [`Self::split`].
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.end - self.offset
    }

    /// Takes the next `len` bytes as a parser of their own. The new parser
    /// can't read past them, and keeps reporting offsets into the whole
    /// buffer.
    pub fn split(&mut self, len: usize) -> ClassResult<ByteParser<'src>> {
        self.peek(len)?;
        let sub = ByteParser {
            src: self.src,
            offset: self.offset,
            end: self.offset + len,
        };
        self.offset += len;
        Ok(sub)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self, needed: usize) -> ClassError {
        ClassError::TruncatedInput {
            offset: self.offset,
            needed,
            remaining: self.remaining(),
        }
    }

    /// Takes `len` bytes, and errors if there were not enough bytes remaining.
    pub fn take(&mut self, len: usize) -> ClassResult<&'src [u8]> {
        if self.remaining() < len {
            Err(self.truncated(len))
        } else {
            let res = &self.src[self.offset..self.offset + len];
            self.offset += len;
            Ok(res)
        }
    }

    /// Like `take`, but does not advance the parser.
    pub fn peek(&self, len: usize) -> ClassResult<&'src [u8]> {
        if self.remaining() < len {
            Err(self.truncated(len))
        } else {
            Ok(&self.src[self.offset..self.offset + len])
        }
    }

    /// Applies `func` exactly `len` times, and returns the items it produced
    /// in order. Stops at the first error.
    pub fn seq<F, T, E>(&mut self, len: usize, mut func: F) -> Result<Box<[T]>, E>
    where
        F: FnMut(&mut Self) -> Result<T, E>,
    {
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(func(self)?);
        }
        Ok(vec.into())
    }

    /// Reads a `u16` count followed by that many items.
    pub fn counted<F, T>(&mut self, func: F) -> ClassResult<Box<[T]>>
    where
        F: FnMut(&mut Self) -> ClassResult<T>,
    {
        let len = self.parse_u16()? as usize;
        self.seq(len, func)
    }

    pub fn parse_u8(&mut self) -> ClassResult<u8> {
        self.take(1).map(|b| b[0])
    }

    pub fn parse_u16(&mut self) -> ClassResult<u16> {
        self.take(2).map(BigEndian::read_u16)
    }

    pub fn parse_u32(&mut self) -> ClassResult<u32> {
        self.take(4).map(BigEndian::read_u32)
    }

    pub fn parse_u64(&mut self) -> ClassResult<u64> {
        self.take(8).map(BigEndian::read_u64)
    }

    pub fn parse_i32(&mut self) -> ClassResult<i32> {
        self.take(4).map(BigEndian::read_i32)
    }

    pub fn parse_i64(&mut self) -> ClassResult<i64> {
        self.take(8).map(BigEndian::read_i64)
    }
}
