//! Framing error types.

use thiserror::Error;

/// Errors that can occur when building or parsing UNPI frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnpiError {
    /// Payload does not fit in a single frame.
    #[error("payload too long: maximum {max} bytes, got {actual}")]
    PayloadTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Unknown message type bits in CMD0.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// Unknown subsystem bits in CMD0.
    #[error("unknown subsystem: 0x{0:02X}")]
    UnknownSubsystem(u8),

    /// Frame check sequence did not match.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// FCS computed over the received bytes.
        expected: u8,
        /// FCS carried by the frame.
        actual: u8,
    },
}
