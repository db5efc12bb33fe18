//! Storage type for variable-length byte fields.
//!
//! Decoding a variable block either hands out a view into the decode buffer
//! (zero-copy, no ownership transfer) or a freshly allocated copy owned by
//! the record. The two cases are distinct variants so the ownership handoff
//! is visible in the type.

use bytes::Bytes;

/// A variable-length byte block held by a record.
#[derive(Debug, Clone)]
pub enum ByteBuf {
    /// Shared view into a decode buffer (or any `Bytes`).
    View(Bytes),
    /// Buffer allocated for, and owned by, the record.
    Owned(Vec<u8>),
}

impl ByteBuf {
    /// Empty view.
    pub fn new() -> Self {
        ByteBuf::View(Bytes::new())
    }

    /// Contents as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ByteBuf::View(b) => b,
            ByteBuf::Owned(v) => v,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// True when the record owns the allocation.
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, ByteBuf::Owned(_))
    }

    /// Convert into an owned vector, copying a view.
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            ByteBuf::View(b) => b.to_vec(),
            ByteBuf::Owned(v) => v,
        }
    }
}

impl Default for ByteBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ByteBuf {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuf {}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(v: Vec<u8>) -> Self {
        ByteBuf::Owned(v)
    }
}

impl From<Bytes> for ByteBuf {
    fn from(b: Bytes) -> Self {
        ByteBuf::View(b)
    }
}

impl From<&'static [u8]> for ByteBuf {
    fn from(s: &'static [u8]) -> Self {
        ByteBuf::View(Bytes::from_static(s))
    }
}
