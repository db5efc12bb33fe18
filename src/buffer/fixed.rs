//! Fixed-capacity sink over a caller-provided slice.

use super::ByteSink;
use crate::error::{Result, SerializeError};

/// Sink over `&mut [u8]` that never writes past the slice end.
#[derive(Debug)]
pub struct FixedBuf<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> FixedBuf<'a> {
    /// Wrap `buf`; nothing is committed yet.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.len
    }
}

impl ByteSink for FixedBuf<'_> {
    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buf.len()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        if additional > self.remaining() {
            return Err(SerializeError::BufferExhausted {
                requested: additional,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn set_len(&mut self, len: usize) {
        assert!(len <= self.buf.len(), "set_len past fixed capacity");
        self.len = len;
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn slice_at_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        assert!(offset + len <= self.len, "slice past committed length");
        &mut self.buf[offset..offset + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_within_capacity() {
        let mut storage = [0u8; 8];
        let mut buf = FixedBuf::new(&mut storage);

        buf.alloc(4).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        buf.alloc(4).unwrap().copy_from_slice(&[5, 6, 7, 8]);

        assert_eq!(buf.len(), 8);
        assert_eq!(buf.remaining(), 0);
        assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_alloc_past_end_fails_without_commit() {
        let mut storage = [0u8; 3];
        let mut buf = FixedBuf::new(&mut storage);
        buf.alloc(2).unwrap();

        let err = buf.alloc(2).unwrap_err();
        assert_eq!(
            err,
            SerializeError::BufferExhausted {
                requested: 2,
                remaining: 1
            }
        );
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_zero_length_alloc_at_end() {
        let mut storage = [0u8; 1];
        let mut buf = FixedBuf::new(&mut storage);
        buf.alloc(1).unwrap();
        assert!(buf.alloc(0).unwrap().is_empty());
    }
}
