//! Checksum-only codec.
//!
//! Feeds the exact bytes the binary encoder would emit into a running
//! CRC-32 without building a stream, so the result equals the integrity
//! trailer [`Marshal`](super::Marshal) appends for the same record.

use crc32fast::Hasher;
use tracing::trace;

use super::wire_len;
use crate::error::Result;
use crate::serialize::{flags, Action, ActionState, ByteBuf, Context, Record, Visitor};

pub struct MarshalCrc {
    state: ActionState,
    hasher: Hasher,
}

impl MarshalCrc {
    pub fn new(context: Context) -> Self {
        Self {
            state: ActionState::new(Action::Info, context, 0),
            hasher: Hasher::new(),
        }
    }

    /// Feed the fields of `record` into the checksum.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.state.check()
    }

    /// Checksum of everything fed so far.
    pub fn crc(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    #[inline]
    fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        self.state.check()?;
        self.hasher.update(bytes);
        Ok(())
    }

    fn feed_prefixed(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.state.check()?;
        match wire_len(name, bytes.len()) {
            Ok(len) => {
                self.feed(&len.to_be_bytes())?;
                self.feed(bytes)
            }
            Err(err) => self.state.fail(err),
        }
    }
}

impl Visitor for MarshalCrc {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn process_u32(&mut self, _name: &str, v: &mut u32) -> Result<()> {
        self.feed(&v.to_be_bytes())
    }

    fn process_u16(&mut self, _name: &str, v: &mut u16) -> Result<()> {
        self.feed(&v.to_be_bytes())
    }

    fn process_u8(&mut self, _name: &str, v: &mut u8) -> Result<()> {
        self.feed(&[*v])
    }

    fn process_bool(&mut self, _name: &str, v: &mut bool) -> Result<()> {
        self.feed(&[u8::from(*v)])
    }

    fn process_fixed(&mut self, _name: &str, buf: &mut [u8]) -> Result<()> {
        self.feed(buf)
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()> {
        if flags::has_flag(flags, flags::NULL_TERMINATED) {
            self.feed(buf.as_slice())?;
            self.feed(&[flags::TERMINATOR])?;
        } else {
            self.feed_prefixed(name, buf.as_slice())?;
        }
        trace!(field = name, len = buf.len(), "bytes crc");
        Ok(())
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        self.feed_prefixed(name, s.as_bytes())
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)
    }
}
