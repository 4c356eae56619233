//! Little-endian payload codec.
//!
//! All multi-byte integers on the MT API are little-endian. Variable length
//! fields carry a one-byte element count in front of them.

use bytes::BufMut;

use crate::error::ProtocolError;

/// A structured message payload with a fixed byte encoding.
pub trait Payload: Sized {
    /// Append the encoded payload to `buf`.
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError>;

    /// Decode the payload from a reader.
    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError>;

    /// Encode into a freshly allocated buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode from a complete payload.
    ///
    /// Trailing bytes are ignored; newer firmware appends fields to some
    /// indications.
    fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(data);
        let value = Self::decode(&mut reader)?;
        if reader.remaining() > 0 {
            log::trace!("ignoring {} trailing payload bytes", reader.remaining());
        }
        Ok(value)
    }
}

/// Cursor over a payload that reports truncation with offsets.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Take the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                offset: self.offset,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Take a fixed-size array.
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, ProtocolError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.u8()? != 0)
    }

    /// Take a byte string prefixed with a one-byte length.
    pub fn prefixed_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        let len = self.u8()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Take a list of 16-bit values prefixed with a one-byte count.
    pub fn prefixed_u16s(&mut self) -> Result<Vec<u16>, ProtocolError> {
        let count = self.u8()? as usize;
        (0..count).map(|_| self.u16()).collect()
    }
}

/// Append a byte string with a one-byte length prefix.
pub fn put_prefixed_bytes(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), ProtocolError> {
    let len = prefix_len(data.len())?;
    buf.put_u8(len);
    buf.extend_from_slice(data);
    Ok(())
}

/// Append a list of 16-bit values with a one-byte count prefix.
pub fn put_prefixed_u16s(buf: &mut Vec<u8>, values: &[u16]) -> Result<(), ProtocolError> {
    let count = prefix_len(values.len())?;
    buf.put_u8(count);
    for value in values {
        buf.put_u16_le(*value);
    }
    Ok(())
}

fn prefix_len(len: usize) -> Result<u8, ProtocolError> {
    u8::try_from(len).map_err(|_| ProtocolError::FieldTooLong {
        max: u8::MAX as usize,
        actual: len,
    })
}
