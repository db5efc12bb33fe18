//! Size-only codec.

use tracing::trace;

use super::{wire_len, CRC_SIZE};
use crate::error::Result;
use crate::serialize::{flags, options, Action, ActionState, ByteBuf, Context, Record, Visitor};

/// Accumulates the number of bytes [`Marshal`](super::Marshal) would write
/// for the same records and options. With `USE_CRC` the single trailer of
/// the traversal is counted once.
pub struct MarshalSize {
    state: ActionState,
    size: usize,
    framed: bool,
}

impl MarshalSize {
    pub fn new(context: Context, options: u32) -> Self {
        Self {
            state: ActionState::new(Action::Info, context, options),
            size: 0,
            framed: false,
        }
    }

    /// Add the encoded size of `record`.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if !self.framed && self.state.has_option(options::USE_CRC) {
            self.size += CRC_SIZE;
            self.framed = true;
        }

        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.state.check()
    }

    /// Measured size.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    fn add(&mut self, n: usize) -> Result<()> {
        self.state.check()?;
        self.size += n;
        Ok(())
    }

    fn add_prefixed(&mut self, name: &str, len: usize) -> Result<()> {
        self.state.check()?;
        match wire_len(name, len) {
            Ok(_) => self.add(4 + len),
            Err(err) => self.state.fail(err),
        }
    }
}

impl Visitor for MarshalSize {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn process_u32(&mut self, _name: &str, _v: &mut u32) -> Result<()> {
        self.add(4)
    }

    fn process_u16(&mut self, _name: &str, _v: &mut u16) -> Result<()> {
        self.add(2)
    }

    fn process_u8(&mut self, _name: &str, _v: &mut u8) -> Result<()> {
        self.add(1)
    }

    fn process_bool(&mut self, _name: &str, _v: &mut bool) -> Result<()> {
        self.add(1)
    }

    fn process_fixed(&mut self, _name: &str, buf: &mut [u8]) -> Result<()> {
        self.add(buf.len())
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()> {
        trace!(field = name, len = buf.len(), "bytes size");
        if flags::has_flag(flags, flags::NULL_TERMINATED) {
            self.add(buf.len() + 1)
        } else {
            self.add_prefixed(name, buf.len())
        }
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        self.add_prefixed(name, s.len())
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Mixed {
        n: u32,
        m: u16,
        flag: bool,
        tag: [u8; 6],
        data: ByteBuf,
        path: ByteBuf,
        label: String,
    }

    impl Record for Mixed {
        fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
            v.process_u32("n", &mut self.n)?;
            v.process_u16("m", &mut self.m)?;
            v.process_bool("flag", &mut self.flag)?;
            v.process_fixed("tag", &mut self.tag)?;
            v.process_bytes("data", &mut self.data, flags::ALLOC_MEM)?;
            v.process_bytes("path", &mut self.path, flags::NULL_TERMINATED)?;
            v.process_string("label", &mut self.label)
        }
    }

    fn mixed() -> Mixed {
        Mixed {
            n: 1,
            m: 2,
            flag: false,
            tag: [0; 6],
            data: ByteBuf::from(vec![1, 2, 3]),
            path: ByteBuf::from(&b"/tmp"[..]),
            label: "abc".to_string(),
        }
    }

    #[test]
    fn test_size_per_field_kind() {
        let mut size = MarshalSize::new(Context::Local, 0);
        size.run(&mut mixed()).unwrap();
        // 4 + 2 + 1 + 6 + (4 + 3) + (4 + 1) + (4 + 3)
        assert_eq!(size.size(), 32);
    }

    #[test]
    fn test_size_reserves_trailer() {
        let mut size = MarshalSize::new(Context::Local, options::USE_CRC);
        size.run(&mut mixed()).unwrap();
        assert_eq!(size.size(), 32 + CRC_SIZE);
    }

    #[test]
    fn test_size_accumulates_across_records() {
        let mut size = MarshalSize::new(Context::Local, 0);
        size.run(&mut mixed()).unwrap();
        size.run(&mut mixed()).unwrap();
        assert_eq!(size.size(), 64);
    }

    #[test]
    fn test_size_counts_one_trailer_per_traversal() {
        let mut size = MarshalSize::new(Context::Local, options::USE_CRC);
        size.run(&mut mixed()).unwrap();
        size.run(&mut mixed()).unwrap();
        assert_eq!(size.size(), 64 + CRC_SIZE);
    }
}
