//! SYS subsystem: reset, addresses and NV memory access.

use bytes::BufMut;

use crate::codec::{put_prefixed_bytes, Payload, Reader};
use crate::error::ProtocolError;
use crate::kind::{MessageKind, ZStackMessage};
use crate::status::ZStackStatus;
use crate::types::IeeeAddress;

/// Kind of reset requested from the network processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    /// Full hardware reset via the watchdog.
    Hard,
    /// Restart of the Z-Stack task only.
    Soft,
}

/// Request a reset. Answered by [`SysResetInd`], not by a synchronous reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysResetReq {
    pub reset_type: ResetType,
}

impl Payload for SysResetReq {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(match self.reset_type {
            ResetType::Hard => 0x00,
            ResetType::Soft => 0x01,
        });
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        let reset_type = match reader.u8()? {
            0x00 => ResetType::Hard,
            0x01 => ResetType::Soft,
            other => return Err(ProtocolError::invalid("reset type", other)),
        };
        Ok(SysResetReq { reset_type })
    }
}

impl ZStackMessage for SysResetReq {
    const KIND: MessageKind = MessageKind::SysResetRequest;
}

/// Firmware version reported after every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    pub transport_revision: u8,
    pub product_id: u8,
    pub major_release: u8,
    pub minor_release: u8,
    pub hardware_revision: u8,
}

impl Version {
    /// Z-Stack 3.x builds report a non-zero product id.
    ///
    /// Those builds ship a valid default trust-centre link key.
    pub fn is_v3(&self) -> bool {
        self.product_id > 0
    }
}

/// Indication sent by the network processor once it has (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysResetInd {
    /// Reason code (power-up, external, watchdog).
    pub reason: u8,
    pub version: Version,
}

impl Payload for SysResetInd {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.reason);
        buf.put_u8(self.version.transport_revision);
        buf.put_u8(self.version.product_id);
        buf.put_u8(self.version.major_release);
        buf.put_u8(self.version.minor_release);
        buf.put_u8(self.version.hardware_revision);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(SysResetInd {
            reason: reader.u8()?,
            version: Version {
                transport_revision: reader.u8()?,
                product_id: reader.u8()?,
                major_release: reader.u8()?,
                minor_release: reader.u8()?,
                hardware_revision: reader.u8()?,
            },
        })
    }
}

impl ZStackMessage for SysResetInd {
    const KIND: MessageKind = MessageKind::SysResetIndication;
}

empty_message!(
    /// Read the adapter's own IEEE address.
    SysGetExtAddr => SysGetExtAddr
);

/// Reply carrying the adapter's IEEE address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysGetExtAddrReply {
    pub ieee_address: IeeeAddress,
}

impl Payload for SysGetExtAddrReply {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u64_le(self.ieee_address.0);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(SysGetExtAddrReply {
            ieee_address: IeeeAddress(reader.u64()?),
        })
    }
}

impl ZStackMessage for SysGetExtAddrReply {
    const KIND: MessageKind = MessageKind::SysGetExtAddrReply;
}

/// Read an NV item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysOsalNvRead {
    pub item_id: u16,
    pub offset: u8,
}

impl Payload for SysOsalNvRead {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.item_id);
        buf.put_u8(self.offset);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(SysOsalNvRead {
            item_id: reader.u16()?,
            offset: reader.u8()?,
        })
    }
}

impl ZStackMessage for SysOsalNvRead {
    const KIND: MessageKind = MessageKind::SysOsalNvRead;
}

/// Reply to [`SysOsalNvRead`] with the raw item bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysOsalNvReadReply {
    pub status: ZStackStatus,
    pub value: Vec<u8>,
}

impl Payload for SysOsalNvReadReply {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.status.0);
        put_prefixed_bytes(buf, &self.value)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(SysOsalNvReadReply {
            status: ZStackStatus(reader.u8()?),
            value: reader.prefixed_bytes()?,
        })
    }
}

impl ZStackMessage for SysOsalNvReadReply {
    const KIND: MessageKind = MessageKind::SysOsalNvReadReply;

    fn status(&self) -> Option<ZStackStatus> {
        Some(self.status)
    }
}

/// Write an NV item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysOsalNvWrite {
    pub item_id: u16,
    pub offset: u8,
    pub value: Vec<u8>,
}

impl Payload for SysOsalNvWrite {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.item_id);
        buf.put_u8(self.offset);
        put_prefixed_bytes(buf, &self.value)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(SysOsalNvWrite {
            item_id: reader.u16()?,
            offset: reader.u8()?,
            value: reader.prefixed_bytes()?,
        })
    }
}

impl ZStackMessage for SysOsalNvWrite {
    const KIND: MessageKind = MessageKind::SysOsalNvWrite;
}

status_reply!(
    /// Reply to [`SysOsalNvWrite`].
    SysOsalNvWriteReply => SysOsalNvWriteReply
);
