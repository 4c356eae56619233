//! AF subsystem: endpoint registration and application data.

use bytes::BufMut;

use crate::codec::{put_prefixed_bytes, put_prefixed_u16s, Payload, Reader};
use crate::error::ProtocolError;
use crate::kind::{MessageKind, ZStackMessage};
use crate::status::ZStackStatus;
use crate::types::{ClusterId, Endpoint, NetworkAddress, ProfileId};

/// Register an application endpoint on the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfRegister {
    pub endpoint: Endpoint,
    pub app_profile_id: ProfileId,
    pub app_device_id: u16,
    pub app_device_version: u8,
    /// Always zero; Zigbee defines no other latency option.
    pub latency_req: u8,
    pub app_in_clusters: Vec<ClusterId>,
    pub app_out_clusters: Vec<ClusterId>,
}

impl Payload for AfRegister {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.endpoint.0);
        buf.put_u16_le(self.app_profile_id.0);
        buf.put_u16_le(self.app_device_id);
        buf.put_u8(self.app_device_version);
        buf.put_u8(self.latency_req);
        let in_clusters: Vec<u16> = self.app_in_clusters.iter().map(|c| c.0).collect();
        put_prefixed_u16s(buf, &in_clusters)?;
        let out_clusters: Vec<u16> = self.app_out_clusters.iter().map(|c| c.0).collect();
        put_prefixed_u16s(buf, &out_clusters)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(AfRegister {
            endpoint: Endpoint(reader.u8()?),
            app_profile_id: ProfileId(reader.u16()?),
            app_device_id: reader.u16()?,
            app_device_version: reader.u8()?,
            latency_req: reader.u8()?,
            app_in_clusters: reader.prefixed_u16s()?.into_iter().map(ClusterId).collect(),
            app_out_clusters: reader.prefixed_u16s()?.into_iter().map(ClusterId).collect(),
        })
    }
}

impl ZStackMessage for AfRegister {
    const KIND: MessageKind = MessageKind::AfRegister;
}

status_reply!(
    /// Reply to [`AfRegister`].
    AfRegisterReply => AfRegisterReply
);

/// Transmit options of an [`AfDataRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AfDataRequestOptions {
    /// Request an APS acknowledgement from the destination.
    pub ack_request: bool,
    /// Force route discovery.
    pub discover_route: bool,
    /// Enable APS security.
    pub enable_security: bool,
}

impl AfDataRequestOptions {
    const ACK_REQUEST: u8 = 0x10;
    const DISCOVER_ROUTE: u8 = 0x20;
    const ENABLE_SECURITY: u8 = 0x40;

    fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.ack_request {
            bits |= Self::ACK_REQUEST;
        }
        if self.discover_route {
            bits |= Self::DISCOVER_ROUTE;
        }
        if self.enable_security {
            bits |= Self::ENABLE_SECURITY;
        }
        bits
    }

    fn from_bits(bits: u8) -> Self {
        AfDataRequestOptions {
            ack_request: bits & Self::ACK_REQUEST != 0,
            discover_route: bits & Self::DISCOVER_ROUTE != 0,
            enable_security: bits & Self::ENABLE_SECURITY != 0,
        }
    }
}

/// Send application data to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfDataRequest {
    pub destination_address: NetworkAddress,
    pub destination_endpoint: Endpoint,
    pub source_endpoint: Endpoint,
    pub cluster_id: ClusterId,
    /// Echoed back in the matching [`AfDataConfirm`].
    pub transaction_id: u8,
    pub options: AfDataRequestOptions,
    /// Maximum hop count.
    pub radius: u8,
    pub data: Vec<u8>,
}

impl Payload for AfDataRequest {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.destination_address.0);
        buf.put_u8(self.destination_endpoint.0);
        buf.put_u8(self.source_endpoint.0);
        buf.put_u16_le(self.cluster_id.0);
        buf.put_u8(self.transaction_id);
        buf.put_u8(self.options.bits());
        buf.put_u8(self.radius);
        put_prefixed_bytes(buf, &self.data)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(AfDataRequest {
            destination_address: NetworkAddress(reader.u16()?),
            destination_endpoint: Endpoint(reader.u8()?),
            source_endpoint: Endpoint(reader.u8()?),
            cluster_id: ClusterId(reader.u16()?),
            transaction_id: reader.u8()?,
            options: AfDataRequestOptions::from_bits(reader.u8()?),
            radius: reader.u8()?,
            data: reader.prefixed_bytes()?,
        })
    }
}

impl ZStackMessage for AfDataRequest {
    const KIND: MessageKind = MessageKind::AfDataRequest;
}

status_reply!(
    /// Immediate reply to [`AfDataRequest`]: the frame was queued for transmission.
    AfDataRequestReply => AfDataRequestReply
);

/// Delivery outcome of an earlier [`AfDataRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfDataConfirm {
    pub status: ZStackStatus,
    pub endpoint: Endpoint,
    pub transaction_id: u8,
}

impl Payload for AfDataConfirm {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.status.0);
        buf.put_u8(self.endpoint.0);
        buf.put_u8(self.transaction_id);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(AfDataConfirm {
            status: ZStackStatus(reader.u8()?),
            endpoint: Endpoint(reader.u8()?),
            transaction_id: reader.u8()?,
        })
    }
}

impl ZStackMessage for AfDataConfirm {
    const KIND: MessageKind = MessageKind::AfDataConfirm;

    fn status(&self) -> Option<ZStackStatus> {
        Some(self.status)
    }
}

/// Application data received from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfIncomingMsg {
    pub group_id: u16,
    pub cluster_id: ClusterId,
    pub source_address: NetworkAddress,
    pub source_endpoint: Endpoint,
    pub destination_endpoint: Endpoint,
    pub was_broadcast: bool,
    pub link_quality: u8,
    pub security_use: bool,
    pub timestamp: u32,
    pub transaction_sequence: u8,
    pub data: Vec<u8>,
}

impl Payload for AfIncomingMsg {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.group_id);
        buf.put_u16_le(self.cluster_id.0);
        buf.put_u16_le(self.source_address.0);
        buf.put_u8(self.source_endpoint.0);
        buf.put_u8(self.destination_endpoint.0);
        buf.put_u8(self.was_broadcast as u8);
        buf.put_u8(self.link_quality);
        buf.put_u8(self.security_use as u8);
        buf.put_u32_le(self.timestamp);
        buf.put_u8(self.transaction_sequence);
        put_prefixed_bytes(buf, &self.data)
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(AfIncomingMsg {
            group_id: reader.u16()?,
            cluster_id: ClusterId(reader.u16()?),
            source_address: NetworkAddress(reader.u16()?),
            source_endpoint: Endpoint(reader.u8()?),
            destination_endpoint: Endpoint(reader.u8()?),
            was_broadcast: reader.bool()?,
            link_quality: reader.u8()?,
            security_use: reader.bool()?,
            timestamp: reader.u32()?,
            transaction_sequence: reader.u8()?,
            data: reader.prefixed_bytes()?,
        })
    }
}

impl ZStackMessage for AfIncomingMsg {
    const KIND: MessageKind = MessageKind::AfIncomingMsg;
}
