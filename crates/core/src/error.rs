//! Error types for the flashtag engine.
//!
//! Every failure is fatal to the current encode or decode pass. Nothing in the
//! engine catches and continues: once the cursor is somewhere the framing did
//! not predict, every later record would be read from the wrong place.

use thiserror::Error;

use crate::registry::Category;

/// Top-level error type for all operations in the crate.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: reading/writing bits from/to byte buffers
/// - Framing: record headers and the end-position check
/// - Registry: decode-time type dispatch
/// - Field values rejected by a value constructor
/// - Configuration parsing
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., reading past end of buffer)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Record framing error (e.g., header inconsistent, length mismatch)
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// Type dispatch error (e.g., unregistered discriminant in strict mode)
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A field value does not fit the range its wire encoding allows
    #[error("{field} = {value} is out of range {min}..={max}")]
    ValueOutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Bit-level I/O errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BitIoError {
    /// The cursor would run past the end of the buffer
    #[error("truncated buffer: {requested} bits requested at bit {position}, {available} available")]
    TruncatedBuffer {
        position: usize,
        requested: usize,
        available: usize,
    },

    /// Bit or byte count outside what the operation supports
    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),

    /// Value cannot be represented in the requested number of bits
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooWide { value: i64, bits: u32 },

    /// Absolute or relative seek outside the buffer
    #[error("position {position} outside buffer of {limit} bits")]
    PositionOutOfRange { position: i64, limit: usize },

    /// String bytes invalid for the active text encoding
    #[error("text not representable as {encoding}")]
    InvalidText { encoding: &'static str },
}

/// Record framing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FramingError {
    /// Header fields are inconsistent with themselves
    #[error("malformed header at byte {offset}: {reason}")]
    MalformedHeader { offset: usize, reason: &'static str },

    /// The cursor did not end where the declared length says it should
    #[error("{record} at byte {offset} declared {declared} bytes but ended {delta:+} bytes away")]
    RecordLengthMismatch {
        record: &'static str,
        offset: usize,
        declared: usize,
        delta: i64,
    },

    /// The movie does not start with a known signature
    #[error("invalid signature: {0:?}")]
    InvalidSignature([u8; 3]),

    /// The movie body is compressed and must be inflated by the caller
    #[error("compressed movie ({0:?}) must be inflated before decoding")]
    CompressedMovie([u8; 3]),

    /// An encode plan was handed to a record of a different kind
    #[error("encode plan does not belong to {record}")]
    PlanMismatch { record: &'static str },

    /// An `End` tag inside a movie's tag list would cut the movie short
    #[error("End tag at index {index} of a movie's tags")]
    MisplacedEnd { index: usize },
}

/// Type registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No factory is registered for the discriminant
    #[error("unsupported {category} type {code:#x} at byte {offset}")]
    UnsupportedType {
        category: Category,
        code: u16,
        offset: usize,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Check that `value` lies in `min..=max`, naming the field on failure.
pub fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<()> {
    if value < min || value > max {
        return Err(Error::ValueOutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
