//! Frame encoding/decoding utilities.
//!
//! A UNPI frame starts with the `0xFE` marker, followed by the payload
//! length, the two command bytes, the payload and an XOR checksum.
//!
//! ```text
//! +------+-----+------+------+-------------------+-----+
//! | 0xFE | len | cmd0 | cmd1 | data[0..len]      | fcs |
//! +------+-----+------+------+-------------------+-----+
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::*;
use crate::error::UnpiError;
use crate::frame::{Frame, MessageType, Subsystem};

/// A codec for reading and writing UNPI frames.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_PAYLOAD_SIZE + FRAME_OVERHEAD),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame is available, `Ok(None)`
    /// if more data is needed. A corrupt frame is consumed and reported as an
    /// error; decoding can continue with the next call.
    pub fn decode(&mut self) -> Result<Option<Frame>, UnpiError> {
        // Scan for SOF, discarding any preceding garbage
        while !self.buffer.is_empty() && self.buffer[0] != SOF {
            self.buffer.advance(1);
        }

        // SOF + LEN + CMD0 + CMD1 at minimum
        if self.buffer.len() < 4 {
            return Ok(None);
        }

        let len = self.buffer[1] as usize;
        if self.buffer.len() < len + FRAME_OVERHEAD {
            return Ok(None);
        }

        self.buffer.advance(1);
        let body = self.buffer.split_to(len + 3);
        let fcs = self.buffer.get_u8();

        let expected = checksum(&body);
        if expected != fcs {
            log::warn!(
                "discarding UNPI frame with bad checksum (expected 0x{:02X}, got 0x{:02X})",
                expected,
                fcs
            );
            return Err(UnpiError::ChecksumMismatch {
                expected,
                actual: fcs,
            });
        }

        let cmd0 = body[1];
        let message_type = MessageType::try_from(cmd0 >> MESSAGE_TYPE_SHIFT)?;
        let subsystem = Subsystem::try_from(cmd0 & SUBSYSTEM_MASK)?;

        Ok(Some(Frame {
            message_type,
            subsystem,
            command_id: body[2],
            payload: body[3..].to_vec(),
        }))
    }

    /// Encode a frame with marker, length prefix and checksum.
    pub fn encode(frame: &Frame) -> Result<Vec<u8>, UnpiError> {
        if frame.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(UnpiError::PayloadTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: frame.payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(frame.payload.len() + FRAME_OVERHEAD);
        buf.put_u8(SOF);
        buf.put_u8(frame.payload.len() as u8);
        buf.put_u8(frame.cmd0());
        buf.put_u8(frame.command_id);
        buf.extend_from_slice(&frame.payload);
        let fcs = checksum(&buf[1..]);
        buf.put_u8(fcs);
        Ok(buf)
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// XOR of every byte between SOF and FCS.
fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}
