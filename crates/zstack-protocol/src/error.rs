//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Payload ended before a field could be read.
    #[error("payload truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Byte offset of the field being read.
        offset: usize,
        /// Bytes required by the field.
        needed: usize,
        /// Bytes left in the payload.
        remaining: usize,
    },

    /// A length-prefixed field is longer than its prefix can express.
    #[error("field too long: maximum {max} elements, got {actual}")]
    FieldTooLong {
        /// Maximum element count.
        max: usize,
        /// Actual element count.
        actual: usize,
    },

    /// A field holds a value outside its domain.
    #[error("invalid value for {field}: 0x{value:02X}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Raw value.
        value: u64,
    },
}

impl ProtocolError {
    /// Create an invalid value error.
    pub fn invalid(field: &'static str, value: impl Into<u64>) -> Self {
        ProtocolError::InvalidValue {
            field,
            value: value.into(),
        }
    }
}
