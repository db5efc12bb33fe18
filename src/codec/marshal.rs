//! Binary encode/decode codecs.
//!
//! Wire format per field kind:
//! ```text
//! u8            1 byte
//! u16           2 bytes, big endian
//! u32           4 bytes, big endian
//! bool          1 byte, 0 or 1
//! fixed [n]     n raw bytes
//! var bytes     u32 length, then bytes        (default)
//!               bytes, then 0x00 terminator   (NULL_TERMINATED)
//! string        u32 length, then bytes, no terminator
//! trailer       u32 CRC-32 over all preceding bytes (USE_CRC only)
//! ```
//!
//! The trailer is always the last 4 bytes of the buffer and covers every
//! byte the traversal wrote before it. [`Marshal`] writes it after the
//! record's fields; a further `run` on the same encoder drops the trailer,
//! appends the next record and writes a new trailer over the whole
//! traversal. [`Unmarshal`] verifies it once, before the first field is
//! decoded. Neither goes through the field methods.

use std::ops::Range;

use bytes::Bytes;
use tracing::trace;

use super::{head_hex, wire_len, CRC_SIZE};
use crate::buffer::ByteSink;
use crate::error::{Result, SerializeError};
use crate::serialize::{
    flags, options, Action, ActionState, ByteBuf, Context, Record, Visitor,
};

/// Encoding traversal writing into a [`ByteSink`].
pub struct Marshal<'s, S: ByteSink> {
    state: ActionState,
    sink: &'s mut S,
    /// Sink length when the traversal started; the trailer covers
    /// everything from here.
    start: usize,
    /// A trailer currently ends the sink.
    framed: bool,
}

impl<'s, S: ByteSink> Marshal<'s, S> {
    /// Create an encoder appending to `sink`.
    pub fn new(context: Context, sink: &'s mut S, options: u32) -> Self {
        let start = sink.len();
        Self {
            state: ActionState::new(Action::Marshal, context, options),
            sink,
            start,
            framed: false,
        }
    }

    /// Encode `record`, returning the first error of the traversal.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if self.framed {
            let len = self.sink.len();
            self.sink.set_len(len - CRC_SIZE);
            self.framed = false;
        }

        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.end_action();
        self.state.check()
    }

    /// Bytes committed to the sink so far.
    pub fn len(&self) -> usize {
        self.sink.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    fn end_action(&mut self) {
        if self.state.check().is_err() || !self.state.has_option(options::USE_CRC) {
            return;
        }

        let crc = crc32fast::hash(&self.sink.as_slice()[self.start..]);
        if let Ok(slice) = self.next_slice(CRC_SIZE) {
            slice.copy_from_slice(&crc.to_be_bytes());
            self.framed = true;
            trace!(crc, "trailer =>");
        }
    }

    fn next_slice(&mut self, n: usize) -> Result<&mut [u8]> {
        self.state.check()?;
        match self.sink.alloc(n) {
            Ok(slice) => Ok(slice),
            Err(err) => self.state.fail(err),
        }
    }
}

impl<S: ByteSink> Visitor for Marshal<'_, S> {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn process_u32(&mut self, name: &str, v: &mut u32) -> Result<()> {
        self.next_slice(4)?.copy_from_slice(&v.to_be_bytes());
        trace!(field = name, value = *v, "u32 =>");
        Ok(())
    }

    fn process_u16(&mut self, name: &str, v: &mut u16) -> Result<()> {
        self.next_slice(2)?.copy_from_slice(&v.to_be_bytes());
        trace!(field = name, value = *v, "u16 =>");
        Ok(())
    }

    fn process_u8(&mut self, name: &str, v: &mut u8) -> Result<()> {
        self.next_slice(1)?[0] = *v;
        trace!(field = name, value = *v, "u8 =>");
        Ok(())
    }

    fn process_bool(&mut self, name: &str, v: &mut bool) -> Result<()> {
        self.next_slice(1)?[0] = u8::from(*v);
        trace!(field = name, value = *v, "bool =>");
        Ok(())
    }

    fn process_fixed(&mut self, name: &str, buf: &mut [u8]) -> Result<()> {
        self.next_slice(buf.len())?.copy_from_slice(buf);
        trace!(field = name, len = buf.len(), head = %head_hex(buf), "fixed =>");
        Ok(())
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()> {
        self.state.check()?;
        let data = buf.as_slice();

        if flags::has_flag(flags, flags::NULL_TERMINATED) {
            if data.contains(&flags::TERMINATOR) {
                return self.state.fail(SerializeError::EmbeddedTerminator {
                    field: name.to_string(),
                });
            }
            let slice = self.next_slice(data.len() + 1)?;
            slice[..data.len()].copy_from_slice(data);
            slice[data.len()] = flags::TERMINATOR;
        } else {
            let mut len = match wire_len(name, data.len()) {
                Ok(len) => len,
                Err(err) => return self.state.fail(err),
            };
            self.process_u32(name, &mut len)?;
            self.next_slice(data.len())?.copy_from_slice(data);
        }

        trace!(field = name, len = data.len(), head = %head_hex(data), "bytes =>");
        Ok(())
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        self.state.check()?;
        let mut len = match wire_len(name, s.len()) {
            Ok(len) => len,
            Err(err) => return self.state.fail(err),
        };
        self.process_u32(name, &mut len)?;
        self.next_slice(s.len())?.copy_from_slice(s.as_bytes());
        trace!(field = name, value = %s, "string =>");
        Ok(())
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)
    }
}

/// Decoding traversal reading from a shared `Bytes` buffer.
///
/// Variable blocks decode as views into that buffer unless the field asks
/// for [`flags::ALLOC_MEM`].
pub struct Unmarshal {
    state: ActionState,
    buf: Bytes,
    offset: usize,
    /// End of field data; excludes the trailer when one is present.
    limit: usize,
    /// Trailer already checked for this buffer.
    verified: bool,
}

impl Unmarshal {
    /// Create a decoder over `buf`.
    pub fn new(context: Context, buf: impl Into<Bytes>, options: u32) -> Self {
        let buf = buf.into();
        let limit = buf.len();
        Self {
            state: ActionState::new(Action::Unmarshal, context, options),
            buf,
            offset: 0,
            limit,
            verified: false,
        }
    }

    /// Decode into `record`, returning the first error of the traversal.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        self.begin_action()?;

        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.state.check()
    }

    /// Restart decoding from the first byte.
    pub fn rewind(&mut self) {
        self.offset = 0;
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Field bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.limit - self.offset
    }

    fn begin_action(&mut self) -> Result<()> {
        if self.verified || !self.state.has_option(options::USE_CRC) {
            return Ok(());
        }

        let len = self.buf.len();
        if len < CRC_SIZE {
            return self.state.fail(SerializeError::BufferExhausted {
                requested: CRC_SIZE,
                remaining: len,
            });
        }

        let body = len - CRC_SIZE;
        let mut trailer = [0u8; CRC_SIZE];
        trailer.copy_from_slice(&self.buf[body..]);
        let stored = u32::from_be_bytes(trailer);
        let computed = crc32fast::hash(&self.buf[..body]);

        if stored != computed {
            return self
                .state
                .fail(SerializeError::Checksum { stored, computed });
        }

        trace!(crc = stored, "trailer <=");
        self.limit = body;
        self.verified = true;
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<Range<usize>> {
        self.state.check()?;
        let remaining = self.remaining();
        if n > remaining {
            return self.state.fail(SerializeError::BufferExhausted {
                requested: n,
                remaining,
            });
        }
        let range = self.offset..self.offset + n;
        self.offset += n;
        Ok(range)
    }

    fn take_terminated(&mut self, name: &str) -> Result<Range<usize>> {
        self.state.check()?;
        let window = &self.buf[self.offset..self.limit];
        match window.iter().position(|&b| b == flags::TERMINATOR) {
            Some(pos) => {
                let range = self.offset..self.offset + pos;
                self.offset += pos + 1;
                Ok(range)
            }
            None => self.state.fail(SerializeError::UnterminatedField {
                field: name.to_string(),
            }),
        }
    }

    fn copy_out(&mut self, range: Range<usize>) -> Result<Vec<u8>> {
        let mut owned = Vec::new();
        if owned.try_reserve_exact(range.len()).is_err() {
            return self.state.fail(SerializeError::OutOfMemory {
                requested: range.len(),
            });
        }
        owned.extend_from_slice(&self.buf[range]);
        Ok(owned)
    }
}

impl Visitor for Unmarshal {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.limit - self.offset)
    }

    fn process_u32(&mut self, name: &str, v: &mut u32) -> Result<()> {
        let r = self.take(4)?;
        let b = &self.buf[r];
        *v = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        trace!(field = name, value = *v, "u32 <=");
        Ok(())
    }

    fn process_u16(&mut self, name: &str, v: &mut u16) -> Result<()> {
        let r = self.take(2)?;
        let b = &self.buf[r];
        *v = u16::from_be_bytes([b[0], b[1]]);
        trace!(field = name, value = *v, "u16 <=");
        Ok(())
    }

    fn process_u8(&mut self, name: &str, v: &mut u8) -> Result<()> {
        let r = self.take(1)?;
        *v = self.buf[r.start];
        trace!(field = name, value = *v, "u8 <=");
        Ok(())
    }

    fn process_bool(&mut self, name: &str, v: &mut bool) -> Result<()> {
        let r = self.take(1)?;
        *v = self.buf[r.start] != 0;
        trace!(field = name, value = *v, "bool <=");
        Ok(())
    }

    fn process_fixed(&mut self, name: &str, buf: &mut [u8]) -> Result<()> {
        let r = self.take(buf.len())?;
        buf.copy_from_slice(&self.buf[r]);
        trace!(field = name, len = buf.len(), head = %head_hex(buf), "fixed <=");
        Ok(())
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()> {
        let range = if flags::has_flag(flags, flags::NULL_TERMINATED) {
            self.take_terminated(name)?
        } else {
            let mut len = 0u32;
            self.process_u32(name, &mut len)?;
            self.take(len as usize)?
        };

        *buf = if flags::has_flag(flags, flags::ALLOC_MEM) {
            ByteBuf::Owned(self.copy_out(range)?)
        } else {
            ByteBuf::View(self.buf.slice(range))
        };

        trace!(
            field = name,
            len = buf.len(),
            owned = buf.is_owned(),
            head = %head_hex(buf.as_slice()),
            "bytes <="
        );
        Ok(())
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        let mut len = 0u32;
        self.process_u32(name, &mut len)?;
        let r = self.take(len as usize)?;

        match std::str::from_utf8(&self.buf[r]) {
            Ok(text) => {
                s.clear();
                s.push_str(text);
            }
            Err(_) => {
                return self.state.fail(SerializeError::InvalidUtf8 {
                    field: name.to_string(),
                })
            }
        }
        trace!(field = name, value = %s, "string <=");
        Ok(())
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)
    }
}
