//! ZDO subsystem: discovery, network management and device announcements.

use bytes::BufMut;

use crate::codec::{put_prefixed_u16s, Payload, Reader};
use crate::error::ProtocolError;
use crate::kind::{MessageKind, ZStackMessage};
use crate::status::{DeviceState, ZStackStatus};
use crate::types::{IeeeAddress, NetworkAddress};

/// Ask the network for the short address of an IEEE address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoNwkAddrReq {
    pub ieee_address: IeeeAddress,
    /// 0x00 for a single device response, 0x01 to include associated devices.
    pub request_type: u8,
    pub start_index: u8,
}

impl ZdoNwkAddrReq {
    /// Query for a single device.
    pub fn single(ieee_address: IeeeAddress) -> Self {
        ZdoNwkAddrReq {
            ieee_address,
            request_type: 0x00,
            start_index: 0x00,
        }
    }
}

impl Payload for ZdoNwkAddrReq {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u8(self.request_type);
        buf.put_u8(self.start_index);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoNwkAddrReq {
            ieee_address: IeeeAddress(reader.u64()?),
            request_type: reader.u8()?,
            start_index: reader.u8()?,
        })
    }
}

impl ZStackMessage for ZdoNwkAddrReq {
    const KIND: MessageKind = MessageKind::ZdoNwkAddrReq;
}

status_reply!(
    /// Reply to [`ZdoNwkAddrReq`]; the answer arrives as [`ZdoNwkAddrRsp`].
    ZdoNwkAddrReqReply => ZdoNwkAddrReqReply
);

/// Network address response from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZdoNwkAddrRsp {
    pub status: ZStackStatus,
    pub ieee_address: IeeeAddress,
    pub network_address: NetworkAddress,
    pub start_index: u8,
    pub associated_devices: Vec<NetworkAddress>,
}

impl Payload for ZdoNwkAddrRsp {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.status.0);
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u16_le(self.network_address.0);
        buf.put_u8(self.start_index);
        let associated: Vec<u16> = self.associated_devices.iter().map(|a| a.0).collect();
        put_prefixed_u16s(buf, &associated)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoNwkAddrRsp {
            status: ZStackStatus(reader.u8()?),
            ieee_address: IeeeAddress(reader.u64()?),
            network_address: NetworkAddress(reader.u16()?),
            start_index: reader.u8()?,
            associated_devices: reader
                .prefixed_u16s()?
                .into_iter()
                .map(NetworkAddress)
                .collect(),
        })
    }
}

impl ZStackMessage for ZdoNwkAddrRsp {
    const KIND: MessageKind = MessageKind::ZdoNwkAddrRsp;

    fn status(&self) -> Option<ZStackStatus> {
        Some(self.status)
    }
}

/// Ask a node to leave the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoMgmtLeaveReq {
    pub network_address: NetworkAddress,
    pub ieee_address: IeeeAddress,
    pub remove_children: bool,
}

impl Payload for ZdoMgmtLeaveReq {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.network_address.0);
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u8(self.remove_children as u8);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoMgmtLeaveReq {
            network_address: NetworkAddress(reader.u16()?),
            ieee_address: IeeeAddress(reader.u64()?),
            remove_children: reader.u8()? & 0x01 != 0,
        })
    }
}

impl ZStackMessage for ZdoMgmtLeaveReq {
    const KIND: MessageKind = MessageKind::ZdoMgmtLeaveReq;
}

status_reply!(
    /// Reply to [`ZdoMgmtLeaveReq`].
    ZdoMgmtLeaveReqReply => ZdoMgmtLeaveReqReply
);

/// Outcome of a management leave request, sent by the leaving node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoMgmtLeaveRsp {
    pub source_address: NetworkAddress,
    pub status: ZStackStatus,
}

impl Payload for ZdoMgmtLeaveRsp {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.source_address.0);
        buf.put_u8(self.status.0);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoMgmtLeaveRsp {
            source_address: NetworkAddress(reader.u16()?),
            status: ZStackStatus(reader.u8()?),
        })
    }
}

impl ZStackMessage for ZdoMgmtLeaveRsp {
    const KIND: MessageKind = MessageKind::ZdoMgmtLeaveRsp;

    fn status(&self) -> Option<ZStackStatus> {
        Some(self.status)
    }
}

/// Open or close the network for joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoMgmtPermitJoinReq {
    /// 0x02 for a 16-bit address, 0x0F for broadcast.
    pub address_mode: u8,
    pub destination: NetworkAddress,
    /// Seconds to permit joining; zero closes the network.
    pub duration: u8,
    pub tc_significance: u8,
}

impl ZdoMgmtPermitJoinReq {
    const ADDRESS_MODE_BROADCAST: u8 = 0x0F;

    /// Permit joining on every router for `duration` seconds.
    pub fn all_routers(duration: u8) -> Self {
        ZdoMgmtPermitJoinReq {
            address_mode: Self::ADDRESS_MODE_BROADCAST,
            destination: NetworkAddress::ALL_ROUTERS,
            duration,
            tc_significance: 0x00,
        }
    }
}

impl Payload for ZdoMgmtPermitJoinReq {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.address_mode);
        buf.put_u16_le(self.destination.0);
        buf.put_u8(self.duration);
        buf.put_u8(self.tc_significance);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoMgmtPermitJoinReq {
            address_mode: reader.u8()?,
            destination: NetworkAddress(reader.u16()?),
            duration: reader.u8()?,
            tc_significance: reader.u8()?,
        })
    }
}

impl ZStackMessage for ZdoMgmtPermitJoinReq {
    const KIND: MessageKind = MessageKind::ZdoMgmtPermitJoinReq;
}

status_reply!(
    /// Reply to [`ZdoMgmtPermitJoinReq`].
    ZdoMgmtPermitJoinReqReply => ZdoMgmtPermitJoinReqReply
);

/// The adapter's network state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoStateChangeInd {
    pub state: DeviceState,
}

impl Payload for ZdoStateChangeInd {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.state.into());
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoStateChangeInd {
            state: DeviceState::from(reader.u8()?),
        })
    }
}

impl ZStackMessage for ZdoStateChangeInd {
    const KIND: MessageKind = MessageKind::ZdoStateChangeInd;
}

/// A device joined or rejoined and announced itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoEndDeviceAnnceInd {
    pub source_address: NetworkAddress,
    pub network_address: NetworkAddress,
    pub ieee_address: IeeeAddress,
    /// MAC capability flags.
    pub capabilities: u8,
}

impl ZdoEndDeviceAnnceInd {
    const CAPABILITY_ROUTER: u8 = 0x02;

    /// Whether the device announced itself as a full-function (routing) device.
    pub fn is_router(&self) -> bool {
        self.capabilities & Self::CAPABILITY_ROUTER != 0
    }
}

impl Payload for ZdoEndDeviceAnnceInd {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.source_address.0);
        buf.put_u16_le(self.network_address.0);
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u8(self.capabilities);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoEndDeviceAnnceInd {
            source_address: NetworkAddress(reader.u16()?),
            network_address: NetworkAddress(reader.u16()?),
            ieee_address: IeeeAddress(reader.u64()?),
            capabilities: reader.u8()?,
        })
    }
}

impl ZStackMessage for ZdoEndDeviceAnnceInd {
    const KIND: MessageKind = MessageKind::ZdoEndDeviceAnnceInd;
}

/// A device left the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZdoLeaveInd {
    pub source_address: NetworkAddress,
    pub ieee_address: IeeeAddress,
    pub request: bool,
    pub remove_children: bool,
    pub rejoin: bool,
}

impl Payload for ZdoLeaveInd {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.source_address.0);
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u8(self.request as u8);
        buf.put_u8(self.remove_children as u8);
        buf.put_u8(self.rejoin as u8);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ZdoLeaveInd {
            source_address: NetworkAddress(reader.u16()?),
            ieee_address: IeeeAddress(reader.u64()?),
            request: reader.bool()?,
            remove_children: reader.bool()?,
            rejoin: reader.bool()?,
        })
    }
}

impl ZStackMessage for ZdoLeaveInd {
    const KIND: MessageKind = MessageKind::ZdoLeaveInd;
}
