//! UTIL subsystem.

use bytes::BufMut;

use crate::codec::{put_prefixed_u16s, Payload, Reader};
use crate::error::ProtocolError;
use crate::kind::{MessageKind, ZStackMessage};
use crate::status::{DeviceState, ZStackStatus};
use crate::types::{IeeeAddress, NetworkAddress};

empty_message!(
    /// Query the adapter's addresses and state.
    UtilGetDeviceInfo => UtilGetDeviceInfo
);

/// Reply to [`UtilGetDeviceInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilGetDeviceInfoReply {
    pub status: ZStackStatus,
    pub ieee_address: IeeeAddress,
    pub network_address: NetworkAddress,
    /// Bitmask of device types the firmware build supports.
    pub device_type: u8,
    pub device_state: DeviceState,
    pub associated_devices: Vec<NetworkAddress>,
}

impl Payload for UtilGetDeviceInfoReply {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.status.0);
        buf.put_u64_le(self.ieee_address.0);
        buf.put_u16_le(self.network_address.0);
        buf.put_u8(self.device_type);
        buf.put_u8(self.device_state.into());
        let associated: Vec<u16> = self.associated_devices.iter().map(|a| a.0).collect();
        put_prefixed_u16s(buf, &associated)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(UtilGetDeviceInfoReply {
            status: ZStackStatus(reader.u8()?),
            ieee_address: IeeeAddress(reader.u64()?),
            network_address: NetworkAddress(reader.u16()?),
            device_type: reader.u8()?,
            device_state: DeviceState::from(reader.u8()?),
            associated_devices: reader
                .prefixed_u16s()?
                .into_iter()
                .map(NetworkAddress)
                .collect(),
        })
    }
}

impl ZStackMessage for UtilGetDeviceInfoReply {
    const KIND: MessageKind = MessageKind::UtilGetDeviceInfoReply;

    fn status(&self) -> Option<ZStackStatus> {
        Some(self.status)
    }
}
