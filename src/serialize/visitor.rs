//! The field-visitor contract.
//!
//! A [`Record`] lists its fields once, in wire order, by calling one
//! `process_*` method per field on a [`Visitor`]. The same call encodes or
//! decodes depending on which codec is passed in.

use std::any::Any;

use super::action::{Action, ActionState, Context};
use super::field::ByteBuf;
use crate::error::{Result, SerializeError};

/// Upcast support so registry-built records can be downcast to their
/// concrete type.
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Borrow as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Convert a boxed value into `Box<dyn Any>`.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A domain object with a fixed, ordered sequence of serializable fields.
///
/// `serialize` must visit the same fields in the same order every time;
/// that order is the wire order.
pub trait Record: AsAny {
    /// Visit every field in wire order.
    fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()>;
}

impl dyn Record {
    /// Borrow as concrete type `T`.
    pub fn downcast_ref<T: Record>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrow as concrete type `T`.
    pub fn downcast_mut<T: Record>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Check the concrete type.
    pub fn is<T: Record>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// One traversal over a record's fields.
///
/// Every `process_*` call first checks the sticky error and returns it
/// unchanged if one is already stored. Field names are used by text-oriented
/// codecs and ignored by the binary ones.
pub trait Visitor {
    /// Traversal state.
    fn state(&self) -> &ActionState;

    /// Mutable traversal state.
    fn state_mut(&mut self) -> &mut ActionState;

    fn process_u32(&mut self, name: &str, v: &mut u32) -> Result<()>;

    fn process_u16(&mut self, name: &str, v: &mut u16) -> Result<()>;

    fn process_u8(&mut self, name: &str, v: &mut u8) -> Result<()>;

    fn process_bool(&mut self, name: &str, v: &mut bool) -> Result<()>;

    /// Fixed-length block; the length is `buf.len()` on both sides.
    fn process_fixed(&mut self, name: &str, buf: &mut [u8]) -> Result<()>;

    /// Variable-length block, shaped by [`flags`](super::action::flags).
    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()>;

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()>;

    /// Nested record, visited with this same traversal.
    fn process_record(&mut self, name: &str, record: &mut dyn Record) -> Result<()>;

    #[inline]
    fn action(&self) -> Action {
        self.state().action()
    }

    #[inline]
    fn context(&self) -> Context {
        self.state().context()
    }

    #[inline]
    fn options(&self) -> u32 {
        self.state().options()
    }

    /// Unread input left to a decoding traversal; `None` when the codec
    /// does not read from a buffer.
    fn remaining(&self) -> Option<usize> {
        None
    }

    /// True once an error has been signalled.
    #[inline]
    fn error(&self) -> bool {
        self.state().error().is_some()
    }

    fn process_i32(&mut self, name: &str, v: &mut i32) -> Result<()> {
        let mut u = *v as u32;
        self.process_u32(name, &mut u)?;
        *v = u as i32;
        Ok(())
    }

    fn process_i16(&mut self, name: &str, v: &mut i16) -> Result<()> {
        let mut u = *v as u16;
        self.process_u16(name, &mut u)?;
        *v = u as i16;
        Ok(())
    }

    fn process_i8(&mut self, name: &str, v: &mut i8) -> Result<()> {
        let mut u = *v as u8;
        self.process_u8(name, &mut u)?;
        *v = u as i8;
        Ok(())
    }
}

/// Visit a homogeneous sequence: a u32 element count, then each element as
/// a nested record. On decode the vector is replaced by blank elements that
/// are filled one at a time, so a corrupt count fails on the first missing
/// element instead of allocating up front.
///
/// Every element must encode to at least one byte: a decoded count larger
/// than the unread input fails with
/// [`BufferExhausted`](SerializeError::BufferExhausted) before any element
/// is built.
pub fn process_seq<T>(v: &mut dyn Visitor, name: &str, items: &mut Vec<T>) -> Result<()>
where
    T: Record + Default,
{
    let mut count = items.len() as u32;
    v.process_u32(name, &mut count)?;

    if v.action() == Action::Unmarshal {
        items.clear();
        if let Some(remaining) = v.remaining() {
            if count as usize > remaining {
                return v.state_mut().fail(SerializeError::BufferExhausted {
                    requested: count as usize,
                    remaining,
                });
            }
        }
        for _ in 0..count {
            let mut item = T::default();
            v.process_record(name, &mut item)?;
            items.push(item);
        }
        return Ok(());
    }

    for item in items.iter_mut() {
        v.process_record(name, item)?;
    }
    Ok(())
}
