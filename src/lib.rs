//! # fieldwire
//!
//! Serialization support library for a store-and-forward protocol stack.
//!
//! Records describe their fields once, in wire order, against the
//! [`Visitor`](serialize::Visitor) contract. Interchangeable codecs walk that
//! description to produce different representations:
//!
//! - **Binary** ([`codec::Marshal`] / [`codec::Unmarshal`]): big-endian
//!   integers, length-prefixed or terminator-delimited blocks, optional
//!   CRC-32 trailer
//! - **Size** ([`codec::MarshalSize`]): exact encoded length, for
//!   preallocation
//! - **Checksum** ([`codec::MarshalCrc`]): CRC-32 of the encoded form
//! - **Key** ([`codec::KeyMarshal`] / [`codec::KeyUnmarshal`]): printable,
//!   sortable, filesystem-safe tokens
//! - **Text** ([`codec::MarshalString`]): one-line field dump for logs
//!
//! A [`TypeCollection`](registry::TypeCollection) rebuilds polymorphic
//! records from a wire-carried type code.
//!
//! ## Example
//!
//! ```
//! use fieldwire::codec::{marshal_to_bytes, unmarshal};
//! use fieldwire::serialize::{Context, Record, Visitor};
//! use fieldwire::Result;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Peer {
//!     addr: String,
//!     port: u16,
//! }
//!
//! impl Record for Peer {
//!     fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
//!         v.process_string("addr", &mut self.addr)?;
//!         v.process_u16("port", &mut self.port)
//!     }
//! }
//!
//! let mut peer = Peer { addr: "10.0.0.1".into(), port: 4556 };
//! let bytes = marshal_to_bytes(&mut peer, Context::Network, 0).unwrap();
//!
//! let mut decoded = Peer::default();
//! unmarshal(&mut decoded, bytes, Context::Network, 0).unwrap();
//! assert_eq!(decoded, peer);
//! ```

pub mod buffer;
pub mod codec;
pub mod error;
pub mod registry;
pub mod serialize;

pub use error::{Result, SerializeError};
pub use registry::TypeCollection;
pub use serialize::{Record, Visitor};
