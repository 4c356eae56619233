//! Mesh addressing vocabulary.

use std::fmt;

use crate::error::ProtocolError;

/// 64-bit IEEE (MAC) address of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IeeeAddress(pub u64);

impl IeeeAddress {
    /// Address used in trust-centre tables to match every device.
    pub const BROADCAST: IeeeAddress = IeeeAddress(0xffff_ffff_ffff_ffff);

    /// Get the address as a hex string (most significant byte first).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Display for IeeeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// 16-bit network (short) address assigned on join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkAddress(pub u16);

impl NetworkAddress {
    /// The coordinator always takes address zero.
    pub const COORDINATOR: NetworkAddress = NetworkAddress(0x0000);
    /// Broadcast to all routers and the coordinator.
    pub const ALL_ROUTERS: NetworkAddress = NetworkAddress(0xfffc);
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Application endpoint on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Endpoint(pub u8);

/// Cluster identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterId(pub u16);

/// Application profile identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProfileId(pub u16);

impl ProfileId {
    /// Home automation profile.
    pub const HOME_AUTOMATION: ProfileId = ProfileId(0x0104);
}

/// Short PAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanId(pub u16);

/// Extended (64-bit) PAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtendedPanId(pub u64);

/// 128-bit symmetric key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkKey(pub [u8; 16]);

impl NetworkKey {
    /// The well-known default trust-centre link key, "ZigBeeAlliance09".
    pub const DEFAULT_TC_LINK_KEY: NetworkKey = NetworkKey(*b"ZigBeeAlliance09");

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

// Keys are never printed in full.
impl fmt::Debug for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkKey({}..)", hex::encode(&self.0[..2]))
    }
}

/// Role a device plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogicalType {
    /// Network coordinator.
    Coordinator,
    /// Routing device.
    Router,
    /// Sleepy or non-routing end device.
    EndDevice,
}

impl From<LogicalType> for u8 {
    fn from(logical_type: LogicalType) -> Self {
        match logical_type {
            LogicalType::Coordinator => 0x00,
            LogicalType::Router => 0x01,
            LogicalType::EndDevice => 0x02,
        }
    }
}

impl TryFrom<u8> for LogicalType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(LogicalType::Coordinator),
            0x01 => Ok(LogicalType::Router),
            0x02 => Ok(LogicalType::EndDevice),
            other => Err(ProtocolError::invalid("logical type", other)),
        }
    }
}

/// An application-level message addressed to or received from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationMessage {
    /// Cluster the message belongs to.
    pub cluster_id: ClusterId,
    /// Endpoint on the sending device.
    pub source_endpoint: Endpoint,
    /// Endpoint on the receiving device.
    pub destination_endpoint: Endpoint,
    /// ZCL payload.
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(IeeeAddress(1).to_string(), "0x0000000000000001");
        assert_eq!(NetworkAddress(0x4000).to_string(), "0x4000");
        assert_eq!(IeeeAddress(0x00124b0012345678).to_hex(), "00124b0012345678");
    }

    #[test]
    fn test_network_key_debug_is_redacted() {
        let rendered = format!("{:?}", NetworkKey::DEFAULT_TC_LINK_KEY);
        assert!(!rendered.contains("Alliance"));
        assert!(rendered.starts_with("NetworkKey(5a69"));
    }

    #[test]
    fn test_logical_type_conversion() {
        assert_eq!(LogicalType::try_from(0x00).unwrap(), LogicalType::Coordinator);
        assert!(LogicalType::try_from(0x03).is_err());
    }
}
