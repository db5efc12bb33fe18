//! Text dump codec.
//!
//! Flattens a record into one line of text, mainly for log output:
//!
//! ```text
//! 7 dtn://a true            (default)
//! id=7 dst=dtn://a up=true  (INCLUDE_NAME)
//! 7.dtn://a.true            (DOT_SEPARATED)
//! ```
//!
//! Integers print in decimal and booleans as `true`/`false`. Byte blocks
//! print as text with invalid UTF-8 replaced. Nested records are flattened
//! in place without a name of their own.

use std::fmt::Write as _;

use crate::error::Result;
use crate::serialize::{options, Action, ActionState, ByteBuf, Context, Record, Visitor};

pub struct MarshalString {
    state: ActionState,
    buf: String,
    sep: char,
}

impl MarshalString {
    pub fn new(context: Context, options: u32) -> Self {
        let sep = if options::has_option(options, options::DOT_SEPARATED) {
            '.'
        } else {
            ' '
        };
        Self {
            state: ActionState::new(Action::Info, context, options),
            buf: String::new(),
            sep,
        }
    }

    /// Append the fields of `record` to the dump.
    pub fn run(&mut self, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        if !self.buf.is_empty() {
            self.buf.push(self.sep);
        }

        if let Err(err) = record.serialize(self) {
            let _ = self.state.fail::<()>(err);
        }
        if self.buf.ends_with(self.sep) {
            self.buf.pop();
        }
        self.state.check()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    fn field(&mut self, name: &str, value: impl std::fmt::Display) -> Result<()> {
        self.state.check()?;
        if self.state.has_option(options::INCLUDE_NAME) {
            self.buf.push_str(name);
            self.buf.push('=');
        }
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{value}");
        self.buf.push(self.sep);
        Ok(())
    }
}

impl Visitor for MarshalString {
    fn state(&self) -> &ActionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ActionState {
        &mut self.state
    }

    fn process_u32(&mut self, name: &str, v: &mut u32) -> Result<()> {
        self.field(name, *v)
    }

    fn process_u16(&mut self, name: &str, v: &mut u16) -> Result<()> {
        self.field(name, *v)
    }

    fn process_u8(&mut self, name: &str, v: &mut u8) -> Result<()> {
        self.field(name, *v)
    }

    fn process_bool(&mut self, name: &str, v: &mut bool) -> Result<()> {
        self.field(name, *v)
    }

    fn process_fixed(&mut self, name: &str, buf: &mut [u8]) -> Result<()> {
        self.field(name, String::from_utf8_lossy(buf))
    }

    fn process_bytes(&mut self, name: &str, buf: &mut ByteBuf, _flags: u32) -> Result<()> {
        self.field(name, String::from_utf8_lossy(buf.as_slice()))
    }

    fn process_string(&mut self, name: &str, s: &mut String) -> Result<()> {
        self.field(name, s.as_str())
    }

    fn process_record(&mut self, _name: &str, record: &mut dyn Record) -> Result<()> {
        self.state.check()?;
        record.serialize(self)
    }
}
