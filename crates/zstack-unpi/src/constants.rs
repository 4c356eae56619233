//! Framing constants
//!
//! These constants define the byte-level layout of UNPI frames.

/// Start-of-frame marker.
pub const SOF: u8 = 0xFE;

/// Maximum payload length carried in a single frame.
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Bytes surrounding the payload: SOF, LEN, CMD0, CMD1 and FCS.
pub const FRAME_OVERHEAD: usize = 5;

/// Bit position of the message type within CMD0.
pub const MESSAGE_TYPE_SHIFT: u8 = 5;

/// Mask selecting the subsystem bits of CMD0.
pub const SUBSYSTEM_MASK: u8 = 0x1F;
