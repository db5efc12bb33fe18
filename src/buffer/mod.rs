//! Byte sinks - destinations for the encoding codecs.
//!
//! A sink has a committed length and storage behind it. Codecs ask for the
//! next slice with [`ByteSink::alloc`]; a [`FixedBuf`] refuses the moment a
//! request would cross its end, a [`GrowableBuf`] extends its `BytesMut`
//! storage (optionally up to a hard limit).
//!
//! # Example
//!
//! ```
//! use fieldwire::buffer::{ByteSink, FixedBuf, GrowableBuf};
//!
//! let mut storage = [0u8; 4];
//! let mut fixed = FixedBuf::new(&mut storage);
//! fixed.alloc(3).unwrap().copy_from_slice(b"abc");
//! assert!(fixed.alloc(2).is_err());
//! assert_eq!(fixed.as_slice(), b"abc");
//!
//! let mut grow = GrowableBuf::new();
//! grow.alloc(100).unwrap();
//! assert_eq!(grow.len(), 100);
//! ```

mod fixed;
mod growable;

pub use fixed::FixedBuf;
pub use growable::GrowableBuf;

use crate::error::Result;

/// In-memory destination exposing slice allocation.
pub trait ByteSink {
    /// Committed bytes.
    fn len(&self) -> usize;

    /// Bytes the storage can hold without growing.
    fn capacity(&self) -> usize;

    /// Make room for `additional` bytes past [`len`](Self::len).
    fn reserve(&mut self, additional: usize) -> Result<()>;

    /// Set the committed length. Must follow a successful `reserve` when
    /// growing.
    fn set_len(&mut self, len: usize);

    /// Committed bytes as a slice.
    fn as_slice(&self) -> &[u8];

    /// Mutable slice of committed bytes at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `offset + len` exceeds the committed length.
    fn slice_at_mut(&mut self, offset: usize, len: usize) -> &mut [u8];

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reserve, commit and return the next `n` bytes.
    fn alloc(&mut self, n: usize) -> Result<&mut [u8]> {
        self.reserve(n)?;
        let offset = self.len();
        self.set_len(offset + n);
        Ok(self.slice_at_mut(offset, n))
    }
}
