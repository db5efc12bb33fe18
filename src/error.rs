//! Error types for fieldwire.

use thiserror::Error;

/// Main error type for all serialization and registry operations.
///
/// Field-level variants are stored by a traversal the first time they occur
/// and returned again by every later field call, so the type is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializeError {
    /// Fixed destination or source is too small for the requested slice.
    #[error("buffer exhausted: requested {requested} bytes, {remaining} remaining")]
    BufferExhausted {
        /// Bytes the codec asked for.
        requested: usize,
        /// Bytes left in the buffer at that point.
        remaining: usize,
    },

    /// Integrity trailer did not match the recomputed checksum.
    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    Checksum {
        /// Checksum carried in the trailer.
        stored: u32,
        /// Checksum over the received bytes.
        computed: u32,
    },

    /// Type code is not valid for the requested family.
    #[error("type code {code} out of range for {family}")]
    TypeCode {
        /// Requested type code.
        code: u32,
        /// Name of the family (or concrete type) it was requested through.
        family: &'static str,
    },

    /// A registered type was found but its payload failed to decode.
    #[error("corrupt payload for type code {code}: {source}")]
    CorruptPayload {
        /// Type code being reconstructed.
        code: u32,
        /// The decode failure.
        #[source]
        source: Box<SerializeError>,
    },

    /// Buffer growth or object construction could not obtain memory.
    #[error("out of memory: {requested} bytes requested")]
    OutOfMemory {
        /// Size of the failed request (0 when unknown).
        requested: usize,
    },

    /// Key token could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Terminator-delimited buffer contains the terminator byte.
    #[error("field {field} contains the terminator byte")]
    EmbeddedTerminator {
        /// Field name.
        field: String,
    },

    /// Decoded string field is not valid UTF-8.
    #[error("field {field} is not valid UTF-8")]
    InvalidUtf8 {
        /// Field name.
        field: String,
    },

    /// Block is longer than a u32 length prefix can describe.
    #[error("field {field} is {len} bytes, over the u32 length limit")]
    LengthOverflow {
        /// Field name.
        field: String,
        /// Actual block length.
        len: usize,
    },

    /// No terminator found before the end of the decode buffer.
    #[error("field {field} is not terminated")]
    UnterminatedField {
        /// Field name.
        field: String,
    },
}

/// Result type alias using SerializeError.
pub type Result<T> = std::result::Result<T, SerializeError>;
