//! Serialize module - the field-visitor contract and traversal state.
//!
//! - [`Record`] - implemented by domain objects, lists fields in wire order
//! - [`Visitor`] - implemented by codecs, one method per field kind
//! - [`ActionState`] - direction, context, options and sticky error
//! - [`ByteBuf`] - variable-length byte field (view or owned)
//!
//! # Example
//!
//! ```
//! use fieldwire::serialize::{Record, Visitor};
//! use fieldwire::Result;
//!
//! #[derive(Default)]
//! struct Route {
//!     dest: String,
//!     metric: u16,
//!     active: bool,
//! }
//!
//! impl Record for Route {
//!     fn serialize(&mut self, v: &mut dyn Visitor) -> Result<()> {
//!         v.process_string("dest", &mut self.dest)?;
//!         v.process_u16("metric", &mut self.metric)?;
//!         v.process_bool("active", &mut self.active)
//!     }
//! }
//! ```

mod action;
mod field;
mod visitor;

pub use action::{flags, options, Action, ActionState, Context};
pub use field::ByteBuf;
pub use visitor::{process_seq, AsAny, Record, Visitor};
