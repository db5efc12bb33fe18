//! Key codec - records as printable, sortable tokens.
//!
//! ```text
//! u32        8 hex digits, zero padded
//! u16        4 hex digits
//! u8         2 hex digits
//! bool       '1' or '0'
//! fixed [n]  n raw bytes
//! var bytes  8 hex-digit length, then raw bytes
//! string     8 hex-digit length, then raw bytes
//! ```
//!
//! An optional border string is written after every field (nested records
//! included) and skipped again on decode.

use std::ops::Range;

use bytes::Bytes;
use tracing::trace;

use super::wire_len;
use crate::buffer::ByteSink;
use crate::error::{Result, SerializeError};
use crate::serialize::{flags, Action, ActionState, ByteBuf, Context, Record, Visitor};

/// Encodes a record as a key token into a [`ByteSink`].
pub struct KeyMarshal<'s, S: ByteSink> {
    state: ActionState,
    sink: &'s mut S,
    border: Vec<u8>,
}

impl<'s, S: ByteSink> KeyMarshal<'s, S> {
    pub fn new(sink: &'s mut S, border: Option<&str>) -> Self {
        Self {
            state: ActionState::new(Action::Marshal, Context::Local, 0),
            sink,
            border: border.map(|b| b.as_bytes().to_vec()).unwrap_or_default(),
        }
    }

    /// Append the key of `record`.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.state.check()
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.state.check()?;
        match self.sink.alloc(bytes.len()) {
            Ok(slice) => {
                slice.copy_from_slice(bytes);
                Ok(())
            }
            Err(err) => self.state.fail(err),
        }
    }

    fn append_hex(&mut self, be_bytes: &[u8]) -> Result<()> {
        self.append(hex::encode(be_bytes).as_bytes())
    }

    fn append_prefixed(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.state.check()?;
        match wire_len(name, bytes.len()) {
            Ok(len) => {
                self.append_hex(&len.to_be_bytes())?;
                self.append(bytes)
            }
            Err(err) => self.state.fail(err),
        }
    }

    fn border(&mut self) -> Result<()> {
        if self.border.is_empty() {
            return self.state.check();
        }
        let border = std::mem::take(&mut self.border);
        let res = self.append(&border);
        self.border = border;
        res
    }
}

impl<S: ByteSink> Visitor for KeyMarshal<'_, S> {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn process_u32(&mut self, _name: &str, v: &mut u32) -> Result<()> {
        self.append_hex(&v.to_be_bytes())?;
        self.border()
    }

    fn process_u16(&mut self, _name: &str, v: &mut u16) -> Result<()> {
        self.append_hex(&v.to_be_bytes())?;
        self.border()
    }

    fn process_u8(&mut self, _name: &str, v: &mut u8) -> Result<()> {
        self.append_hex(&[*v])?;
        self.border()
    }

    fn process_bool(&mut self, _name: &str, v: &mut bool) -> Result<()> {
        self.append(if *v { b"1" } else { b"0" })?;
        self.border()
    }

    fn process_fixed(&mut self, _name: &str, buf: &mut [u8]) -> Result<()> {
        self.append(buf)?;
        self.border()
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, _flags: u32) -> Result<()> {
        self.append_prefixed(name, buf.as_slice())?;
        trace!(field = name, len = buf.len(), "key bytes");
        self.border()
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        self.append_prefixed(name, s.as_bytes())?;
        self.border()
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)?;
        self.border()
    }
}

/// Parses a key token back into a record.
pub struct KeyUnmarshal {
    state: ActionState,
    buf: Bytes,
    cur: usize,
    border_len: usize,
}

impl KeyUnmarshal {
    pub fn new(buf: impl Into<Bytes>, border: Option<&str>) -> Self {
        Self {
            state: ActionState::new(Action::Unmarshal, Context::Local, 0),
            buf: buf.into(),
            cur: 0,
            border_len: border.map_or(0, str::len),
        }
    }

    /// Decode the next key into `record`.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        self.state.check()
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.cur
    }

    fn take(&mut self, n: usize) -> Result<Range<usize>> {
        self.state.check()?;
        let remaining = self.buf.len() - self.cur;
        if n > remaining {
            return self.state.fail(SerializeError::BufferExhausted {
                requested: n,
                remaining,
            });
        }
        let range = self.cur..self.cur + n;
        self.cur += n;
        Ok(range)
    }

    fn read_hex<const N: usize>(&mut self) -> Result<[u8; N]> {
        let r = self.take(N * 2)?;
        let start = r.start;
        let mut out = [0u8; N];
        match hex::decode_to_slice(&self.buf[r], &mut out) {
            Ok(()) => Ok(out),
            Err(err) => self
                .state
                .fail(SerializeError::InvalidKey(format!("offset {start}: {err}"))),
        }
    }

    fn read_len(&mut self) -> Result<usize> {
        Ok(u32::from_be_bytes(self.read_hex::<4>()?) as usize)
    }

    fn border(&mut self) -> Result<()> {
        self.take(self.border_len).map(|_| ())
    }
}

impl Visitor for KeyUnmarshal {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.buf.len() - self.cur)
    }

    fn process_u32(&mut self, _name: &str, v: &mut u32) -> Result<()> {
        *v = u32::from_be_bytes(self.read_hex::<4>()?);
        self.border()
    }

    fn process_u16(&mut self, _name: &str, v: &mut u16) -> Result<()> {
        *v = u16::from_be_bytes(self.read_hex::<2>()?);
        self.border()
    }

    fn process_u8(&mut self, _name: &str, v: &mut u8) -> Result<()> {
        *v = self.read_hex::<1>()?[0];
        self.border()
    }

    fn process_bool(&mut self, name: &str, v: &mut bool) -> Result<()> {
        let r = self.take(1)?;
        *v = match self.buf[r.start] {
            b'1' => true,
            b'0' => false,
            other => {
                return self.state.fail(SerializeError::InvalidKey(format!(
                    "field {name}: bad bool digit {other:#04x}"
                )))
            }
        };
        self.border()
    }

    fn process_fixed(&mut self, _name: &str, buf: &mut [u8]) -> Result<()> {
        let r = self.take(buf.len())?;
        buf.copy_from_slice(&self.buf[r]);
        self.border()
    }

    fn process_bytes(&mut self, _name: &str, buf: &mut ByteBuf, flags: u32) -> Result<()> {
        let len = self.read_len()?;
        let r = self.take(len)?;
        *buf = if flags::has_flag(flags, flags::ALLOC_MEM) {
            ByteBuf::Owned(self.buf[r].to_vec())
        } else {
            ByteBuf::View(self.buf.slice(r))
        };
        self.border()
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        let len = self.read_len()?;
        let r = self.take(len)?;
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
        self.border()
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)?;
        self.border()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::GrowableBuf;

    #[derive(Debug, Default, PartialEq)]
    struct BundleKey {
        source: String,
        creation: u32,
        seqno: u16,
        frag: u8,
        is_admin: bool,
        eid: ByteBuf,
    }

    impl Record for BundleKey {
        fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
            v.process_string("source", &mut self.source)?;
            v.process_u32("creation", &mut self.creation)?;
            v.process_u16("seqno", &mut self.seqno)?;
            v.process_u8("frag", &mut self.frag)?;
            v.process_bool("is_admin", &mut self.is_admin)?;
            v.process_bytes("eid", &mut self.eid, flags::ALLOC_MEM)
        }
    }

    fn key() -> BundleKey {
        BundleKey {
            source: "dtn://a".to_string(),
            creation: 0x1234,
            seqno: 0xBEEF,
            frag: 0x0A,
            is_admin: true,
            eid: ByteBuf::from(&b"xy"[..]),
        }
    }

    fn encode(record: &mut dyn Record, border: Option<&str>) -> Bytes {
        let mut sink = GrowableBuf::new();
        KeyMarshal::new(&mut sink, border).run(record).unwrap();
        sink.freeze()
    }

    #[test]
    fn test_key_layout() {
        let token = encode(&mut key(), None);
        assert_eq!(
            &token[..],
            &b"00000007dtn://a00001234beef0a100000002xy"[..]
        );
    }

    #[test]
    fn test_key_layout_with_border() {
        struct Two(u8, bool);
        impl Record for Two {
            fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
                v.process_u8("a", &mut self.0)?;
                v.process_bool("b", &mut self.1)
            }
        }

        let token = encode(&mut Two(0xFF, false), Some("-"));
        assert_eq!(&token[..], b"ff-0-");
    }

    #[test]
    fn test_key_round_trip() {
        let mut original = key();
        let token = encode(&mut original, Some("|"));

        let mut decoded = BundleKey::default();
        let mut un = KeyUnmarshal::new(token.clone(), Some("|"));
        un.run(&mut decoded).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(un.offset(), token.len());
    }

    #[test]
    fn test_keys_sort_by_integer_value() {
        struct Id(u32);
        impl Record for Id {
            fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
                v.process_u32("id", &mut self.0)
            }
        }

        let small = encode(&mut Id(9), None);
        let large = encode(&mut Id(10), None);
        assert!(small < large);
    }

    #[test]
    fn test_invalid_hex_rejected() {
        struct Id(u32);
        impl Record for Id {
            fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
                v.process_u32("id", &mut self.0)
            }
        }

        let err = KeyUnmarshal::new(&b"0000zz12"[..], None)
            .run(&mut Id(0))
            .unwrap_err();
        assert!(matches!(err, SerializeError::InvalidKey(_)));
    }

    #[test]
    fn test_truncated_key() {
        let token = encode(&mut key(), None);
        let err = KeyUnmarshal::new(token.slice(..10), None)
            .run(&mut BundleKey::default())
            .unwrap_err();
        assert!(matches!(err, SerializeError::BufferExhausted { .. }));
    }
}
