//! Firmware status codes.

use std::fmt;

/// Status byte returned by replies and confirmations.
///
/// Unknown values are preserved; only zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ZStackStatus(pub u8);

impl ZStackStatus {
    pub const SUCCESS: ZStackStatus = ZStackStatus(0x00);
    pub const FAILURE: ZStackStatus = ZStackStatus(0x01);
    pub const INVALID_PARAMETER: ZStackStatus = ZStackStatus(0x02);
    pub const NV_ITEM_UNINITIALISED: ZStackStatus = ZStackStatus(0x09);
    pub const NV_OPERATION_FAILED: ZStackStatus = ZStackStatus(0x0A);
    pub const NV_BAD_ITEM_LENGTH: ZStackStatus = ZStackStatus(0x0C);
    pub const MEMORY_ERROR: ZStackStatus = ZStackStatus(0x10);
    pub const BUFFER_FULL: ZStackStatus = ZStackStatus(0x11);
    pub const MAC_TRANSACTION_EXPIRED: ZStackStatus = ZStackStatus(0xF0);
    pub const MAC_NO_ACK: ZStackStatus = ZStackStatus(0xE9);
    pub const APS_NO_ACK: ZStackStatus = ZStackStatus(0xB7);
    pub const NWK_NO_ROUTE: ZStackStatus = ZStackStatus(0xCD);

    /// Whether the firmware reported success.
    pub fn is_success(&self) -> bool {
        *self == ZStackStatus::SUCCESS
    }

    fn name(&self) -> Option<&'static str> {
        match *self {
            ZStackStatus::SUCCESS => Some("success"),
            ZStackStatus::FAILURE => Some("failure"),
            ZStackStatus::INVALID_PARAMETER => Some("invalid parameter"),
            ZStackStatus::NV_ITEM_UNINITIALISED => Some("NV item uninitialised"),
            ZStackStatus::NV_OPERATION_FAILED => Some("NV operation failed"),
            ZStackStatus::NV_BAD_ITEM_LENGTH => Some("NV bad item length"),
            ZStackStatus::MEMORY_ERROR => Some("memory error"),
            ZStackStatus::BUFFER_FULL => Some("buffer full"),
            ZStackStatus::MAC_TRANSACTION_EXPIRED => Some("MAC transaction expired"),
            ZStackStatus::MAC_NO_ACK => Some("MAC no ack"),
            ZStackStatus::APS_NO_ACK => Some("APS no ack"),
            ZStackStatus::NWK_NO_ROUTE => Some("no route"),
            _ => None,
        }
    }
}

impl fmt::Display for ZStackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:02X})", name, self.0),
            None => write!(f, "unknown status (0x{:02X})", self.0),
        }
    }
}

impl From<u8> for ZStackStatus {
    fn from(value: u8) -> Self {
        ZStackStatus(value)
    }
}

/// Network state reported by `ZDO_STATE_CHANGE_IND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Hold,
    Initialising,
    NetworkDiscovery,
    Joining,
    Rejoining,
    EndDeviceUnauthenticated,
    EndDevice,
    Router,
    CoordinatorStarting,
    Coordinator,
    Orphan,
    Unknown(u8),
}

impl DeviceState {
    /// States from which the stack will not become a coordinator without a
    /// reconfiguration.
    pub fn is_terminal_non_coordinator(&self) -> bool {
        matches!(
            self,
            DeviceState::EndDevice | DeviceState::Router | DeviceState::Orphan
        )
    }
}

impl From<u8> for DeviceState {
    fn from(value: u8) -> Self {
        match value {
            0x00 => DeviceState::Hold,
            0x01 => DeviceState::Initialising,
            0x02 => DeviceState::NetworkDiscovery,
            0x03 => DeviceState::Joining,
            0x04 => DeviceState::Rejoining,
            0x05 => DeviceState::EndDeviceUnauthenticated,
            0x06 => DeviceState::EndDevice,
            0x07 => DeviceState::Router,
            0x08 => DeviceState::CoordinatorStarting,
            0x09 => DeviceState::Coordinator,
            0x0A => DeviceState::Orphan,
            other => DeviceState::Unknown(other),
        }
    }
}

impl From<DeviceState> for u8 {
    fn from(state: DeviceState) -> Self {
        match state {
            DeviceState::Hold => 0x00,
            DeviceState::Initialising => 0x01,
            DeviceState::NetworkDiscovery => 0x02,
            DeviceState::Joining => 0x03,
            DeviceState::Rejoining => 0x04,
            DeviceState::EndDeviceUnauthenticated => 0x05,
            DeviceState::EndDevice => 0x06,
            DeviceState::Router => 0x07,
            DeviceState::CoordinatorStarting => 0x08,
            DeviceState::Coordinator => 0x09,
            DeviceState::Orphan => 0x0A,
            DeviceState::Unknown(value) => value,
        }
    }
}
