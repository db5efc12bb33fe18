//! Codec module - concrete implementations of the field-visitor contract.
//!
//! - [`Marshal`] / [`Unmarshal`] - binary encode/decode with optional CRC-32 trailer
//! - [`MarshalSize`] - exact encoded size without encoding
//! - [`MarshalCrc`] - checksum of the encoded form without encoding
//! - [`KeyMarshal`] / [`KeyUnmarshal`] - printable, sortable key tokens
//! - [`MarshalString`] - human-readable field dump for logs
//!
//! # Design
//!
//! Every codec keeps its own [`ActionState`](crate::serialize::ActionState)
//! and exposes a `run(&mut dyn Record)` entry point that returns the first
//! error of the traversal. The free functions below cover the common
//! size -> allocate -> encode flow used by storage layers.
//!
//! # Example
//!
//! ```
//! use fieldwire::codec::{marshal_size, marshal_to_bytes, unmarshal};
//! use fieldwire::serialize::{options, Context, Record, Visitor};
//! use fieldwire::Result;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Link {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl Record for Link {
//!     fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
//!         v.process_u32("id", &mut self.id)?;
//!         v.process_string("name", &mut self.name)
//!     }
//! }
//!
//! let mut link = Link { id: 3, name: "tcp0".into() };
//! let bytes = marshal_to_bytes(&mut link, Context::Local, options::USE_CRC).unwrap();
//! assert_eq!(bytes.len(), marshal_size(&mut link, Context::Local, options::USE_CRC).unwrap());
//!
//! let mut decoded = Link::default();
//! unmarshal(&mut decoded, bytes, Context::Local, options::USE_CRC).unwrap();
//! assert_eq!(decoded, link);
//! ```

mod crc;
mod key;
mod marshal;
mod size;
mod string;

pub use crc::MarshalCrc;
pub use key::{KeyMarshal, KeyUnmarshal};
pub use marshal::{Marshal, Unmarshal};
pub use size::MarshalSize;
pub use string::MarshalString;

use bytes::Bytes;

use crate::buffer::{ByteSink, FixedBuf, GrowableBuf};
use crate::error::{Result, SerializeError};
use crate::serialize::{Context, Record};

/// Size of the integrity trailer in bytes.
pub const CRC_SIZE: usize = 4;

/// Number of leading bytes shown when logging byte blocks.
const LOG_HEAD: usize = 16;

/// Hex of the first few bytes of `data`, for trace output.
pub(crate) fn head_hex(data: &[u8]) -> String {
    hex::encode(&data[..data.len().min(LOG_HEAD)])
}

/// Length prefix for a block of `len` bytes.
pub(crate) fn wire_len(field: &str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| SerializeError::LengthOverflow {
        field: field.to_string(),
        len,
    })
}

/// Exact number of bytes `record` encodes to under `options`.
pub fn marshal_size(record: &mut dyn Record, context: Context, options: u32) -> Result<usize> {
    let mut size = MarshalSize::new(context, options);
    size.run(record)?;
    Ok(size.size())
}

/// Measure, allocate exactly, and encode `record`.
pub fn marshal_to_bytes(record: &mut dyn Record, context: Context, options: u32) -> Result<Bytes> {
    let size = marshal_size(record, context, options)?;
    let mut sink = GrowableBuf::with_capacity(size);
    Marshal::new(context, &mut sink, options).run(record)?;
    debug_assert_eq!(sink.len(), size);
    Ok(sink.freeze())
}

/// Encode `record` into a fixed destination, returning the bytes written.
pub fn marshal_into(
    record: &mut dyn Record,
    dest: &mut [u8],
    context: Context,
    options: u32,
) -> Result<usize> {
    let mut sink = FixedBuf::new(dest);
    Marshal::new(context, &mut sink, options).run(record)?;
    Ok(sink.len())
}

/// Decode `buf` into an existing (typically blank) record.
pub fn unmarshal(
    record: &mut dyn Record,
    buf: impl Into<Bytes>,
    context: Context,
    options: u32,
) -> Result<()> {
    Unmarshal::new(context, buf, options).run(record)
}

/// CRC-32 of the encoded form of `record`.
pub fn marshal_crc(record: &mut dyn Record, context: Context) -> Result<u32> {
    let mut crc = MarshalCrc::new(context);
    crc.run(record)?;
    Ok(crc.crc())
}

/// Key token for `record`, with `border` after every field.
pub fn key_of(record: &mut dyn Record, border: Option<&str>) -> Result<Bytes> {
    let mut sink = GrowableBuf::new();
    KeyMarshal::new(&mut sink, border).run(record)?;
    Ok(sink.freeze())
}

/// Parse a key token produced by [`key_of`] back into `record`.
pub fn key_unmarshal(
    record: &mut dyn Record,
    key: impl Into<Bytes>,
    border: Option<&str>,
) -> Result<()> {
    KeyUnmarshal::new(key, border).run(record)
}

/// Text dump of `record`, see [`MarshalString`] for the `options` it honours.
pub fn to_text(record: &mut dyn Record, options: u32) -> Result<String> {
    let mut text = MarshalString::new(Context::Local, options);
    text.run(record)?;
    Ok(text.into_string())
}
