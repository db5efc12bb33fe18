//! Traversal state shared by every codec.
//!
//! A traversal is created per pass, mutated while the record's fields are
//! visited, and discarded afterwards. The first failure is stored and every
//! later field call returns it again without touching any buffer.

use tracing::debug;

use crate::error::{Result, SerializeError};

/// Direction of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// In-memory record -> serialized representation.
    Marshal,
    /// Serialized representation -> in-memory record.
    Unmarshal,
    /// Informative scan (size, checksum) that produces no stream.
    Info,
}

/// General context a traversal runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Context {
    /// No specific context.
    #[default]
    Unknown,
    /// Serialization to/from the network.
    Network,
    /// Serialization to/from local storage.
    Local,
}

/// Traversal-wide option bits.
pub mod options {
    /// Append (encode) or verify (decode) a CRC-32 integrity trailer.
    pub const USE_CRC: u32 = 0b0000_0001;
    /// Text dump: prefix every value with `name=`.
    pub const INCLUDE_NAME: u32 = 0b0000_0010;
    /// Text dump: separate fields with `.` instead of a space.
    pub const DOT_SEPARATED: u32 = 0b0000_0100;

    /// Check if a specific option is set.
    #[inline]
    pub fn has_option(options: u32, option: u32) -> bool {
        options & option != 0
    }
}

/// Per-field flags for variable-length byte blocks.
pub mod flags {
    /// Decode into a freshly allocated buffer owned by the record.
    pub const ALLOC_MEM: u32 = 0b0000_0001;
    /// Delimit with a trailing terminator instead of a length prefix.
    pub const NULL_TERMINATED: u32 = 0b0000_0010;

    /// Terminator byte used by [`NULL_TERMINATED`] fields.
    pub const TERMINATOR: u8 = 0;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(flags: u32, flag: u32) -> bool {
        flags & flag != 0
    }
}

/// Direction, context, options and sticky error of one traversal.
#[derive(Debug, Clone)]
pub struct ActionState {
    action: Action,
    context: Context,
    options: u32,
    error: Option<SerializeError>,
}

impl ActionState {
    /// Create a fresh state with no error recorded.
    pub fn new(action: Action, context: Context, options: u32) -> Self {
        Self {
            action,
            context,
            options,
            error: None,
        }
    }

    /// Traversal direction.
    #[inline]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Traversal context.
    #[inline]
    pub fn context(&self) -> Context {
        self.context
    }

    /// Option bitmask.
    #[inline]
    pub fn options(&self) -> u32 {
        self.options
    }

    /// Check whether an option bit is set.
    #[inline]
    pub fn has_option(&self, option: u32) -> bool {
        options::has_option(self.options, option)
    }

    /// The stored error, if any.
    #[inline]
    pub fn error(&self) -> Option<&SerializeError> {
        self.error.as_ref()
    }

    /// `Err` with the stored error once one has been signalled.
    #[inline]
    pub fn check(&self) -> Result<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Record `err` unless an earlier error is already stored, and return the
    /// stored one.
    pub fn fail<T>(&mut self, err: SerializeError) -> Result<T> {
        if self.error.is_none() {
            debug!(action = ?self.action, error = %err, "traversal failed");
        }
        let stored = self.error.get_or_insert(err);
        Err(stored.clone())
    }

    /// Take the stored error out, leaving the state clean for reuse.
    pub fn take_error(&mut self) -> Option<SerializeError> {
        self.error.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_is_sticky() {
        let mut state = ActionState::new(Action::Marshal, Context::Local, 0);
        assert!(state.check().is_ok());

        let first = SerializeError::BufferExhausted {
            requested: 4,
            remaining: 0,
        };
        let err = state.fail::<()>(first.clone()).unwrap_err();
        assert_eq!(err, first);

        let err = state
            .fail::<()>(SerializeError::InvalidKey("later".to_string()))
            .unwrap_err();
        assert_eq!(err, first);
        assert_eq!(state.check().unwrap_err(), first);
    }

    #[test]
    fn test_take_error_clears_state() {
        let mut state = ActionState::new(Action::Unmarshal, Context::Network, 0);
        let _ = state.fail::<()>(SerializeError::OutOfMemory { requested: 8 });
        assert!(state.take_error().is_some());
        assert!(state.error().is_none());
        assert!(state.check().is_ok());
    }

    #[test]
    fn test_option_and_flag_bits() {
        let state = ActionState::new(Action::Info, Context::Unknown, options::USE_CRC);
        assert!(state.has_option(options::USE_CRC));
        assert!(!options::has_option(0, options::USE_CRC));

        let f = flags::ALLOC_MEM | flags::NULL_TERMINATED;
        assert!(flags::has_flag(f, flags::ALLOC_MEM));
        assert!(flags::has_flag(f, flags::NULL_TERMINATED));
        assert!(!flags::has_flag(flags::ALLOC_MEM, flags::NULL_TERMINATED));
    }
}
