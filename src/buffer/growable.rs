//! Growable sink backed by `bytes::BytesMut`.

use bytes::{Bytes, BytesMut};

use super::ByteSink;
use crate::error::{Result, SerializeError};

/// Sink that extends its storage to fit every request.
///
/// Growth is amortized by `BytesMut`; the committed length is tracked
/// exactly. An optional hard limit turns oversized growth into
/// [`SerializeError::OutOfMemory`], as does any request past `isize::MAX`
/// bytes.
///
/// `BytesMut` has no fallible reserve, so an allocator failure below those
/// bounds aborts the process like any other Rust allocation. Callers that
/// must survive memory pressure set a limit.
#[derive(Debug, Default)]
pub struct GrowableBuf {
    buf: BytesMut,
    limit: Option<usize>,
}

impl GrowableBuf {
    /// Create an empty buffer with no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            limit: None,
        }
    }

    /// Create an empty buffer that refuses to grow past `limit` bytes.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            limit: Some(limit),
        }
    }

    /// Freeze the committed bytes into an immutable `Bytes`.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Drop all committed bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl ByteSink for GrowableBuf {
    #[inline]
    fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    fn reserve(&mut self, additional: usize) -> Result<()> {
        let wanted = self
            .buf
            .len()
            .checked_add(additional)
            .ok_or(SerializeError::OutOfMemory {
                requested: usize::MAX,
            })?;

        if wanted > isize::MAX as usize {
            return Err(SerializeError::OutOfMemory { requested: wanted });
        }
        if let Some(limit) = self.limit {
            if wanted > limit {
                return Err(SerializeError::OutOfMemory { requested: wanted });
            }
        }

        self.buf.reserve(additional);
        Ok(())
    }

    fn set_len(&mut self, len: usize) {
        if len <= self.buf.len() {
            self.buf.truncate(len);
        } else {
            self.buf.resize(len, 0);
        }
    }

    fn as_slice(&self) -> &[u8] {
        &self.buf[..]
    }

    fn slice_at_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        &mut self.buf[offset..offset + len]
    }
}
