//! Persisted configuration items (NV memory).
//!
//! Each item is addressed by a 16-bit id and carries a fixed little-endian
//! encoding. The driver reads and writes them through `SYS_OSAL_NV_READ` and
//! `SYS_OSAL_NV_WRITE`.

use bytes::BufMut;

use crate::codec::{Payload, Reader};
use crate::error::ProtocolError;
use crate::types::{ExtendedPanId, IeeeAddress, LogicalType, NetworkKey, PanId};

/// An NV item with a fixed id.
pub trait NvItem: Payload + PartialEq + std::fmt::Debug + Send + 'static {
    /// Item id used to address the item in NV memory.
    const ITEM_ID: u16;
    /// Human readable name, used in logs and errors.
    const NAME: &'static str;
}

/// Start-up option value that clears both network state and configuration.
pub const STARTUP_CLEAR_STATE_AND_CONFIG: u8 = 0x03;

/// Convert a channel number into the channel mask bytes stored in NV.
///
/// Channels outside 0..=31 produce an empty mask.
pub fn channel_to_bits(channel: u8) -> [u8; 4] {
    1u32.checked_shl(channel as u32).unwrap_or(0).to_le_bytes()
}

macro_rules! flag_item {
    ($(#[$meta:meta])* $name:ident, $id:expr, $label:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name {
            pub enabled: bool,
        }

        impl Payload for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
                buf.put_u8(self.enabled as u8);
                Ok(())
            }

            fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
                Ok($name {
                    enabled: reader.bool()?,
                })
            }
        }

        impl NvItem for $name {
            const ITEM_ID: u16 = $id;
            const NAME: &'static str = $label;
        }
    };
}

/// Start-up behaviour applied on the next reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartUpOption {
    pub start_option: u8,
}

impl Payload for StartUpOption {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.start_option);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(StartUpOption {
            start_option: reader.u8()?,
        })
    }
}

impl NvItem for StartUpOption {
    const ITEM_ID: u16 = 0x0003;
    const NAME: &'static str = "startup option";
}

/// Role the adapter takes when the stack starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalTypeItem {
    pub logical_type: LogicalType,
}

impl Payload for LogicalTypeItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u8(self.logical_type.into());
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(LogicalTypeItem {
            logical_type: LogicalType::try_from(reader.u8()?)?,
        })
    }
}

impl NvItem for LogicalTypeItem {
    const ITEM_ID: u16 = 0x0087;
    const NAME: &'static str = "logical type";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanIdItem {
    pub pan_id: PanId,
}

impl Payload for PanIdItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u16_le(self.pan_id.0);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(PanIdItem {
            pan_id: PanId(reader.u16()?),
        })
    }
}

impl NvItem for PanIdItem {
    const ITEM_ID: u16 = 0x0083;
    const NAME: &'static str = "PAN id";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedPanIdItem {
    pub extended_pan_id: ExtendedPanId,
}

impl Payload for ExtendedPanIdItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u64_le(self.extended_pan_id.0);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ExtendedPanIdItem {
            extended_pan_id: ExtendedPanId(reader.u64()?),
        })
    }
}

impl NvItem for ExtendedPanIdItem {
    const ITEM_ID: u16 = 0x002D;
    const NAME: &'static str = "extended PAN id";
}

/// Channel mask; see [`channel_to_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelListItem {
    pub channels: [u8; 4],
}

impl ChannelListItem {
    pub fn for_channel(channel: u8) -> Self {
        ChannelListItem {
            channels: channel_to_bits(channel),
        }
    }
}

impl Payload for ChannelListItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_slice(&self.channels);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(ChannelListItem {
            channels: reader.array()?,
        })
    }
}

impl NvItem for ChannelListItem {
    const ITEM_ID: u16 = 0x0084;
    const NAME: &'static str = "channel list";
}

flag_item!(
    /// Enables network security.
    SecurityModeItem, 0x0064, "security mode"
);

flag_item!(
    /// Use the pre-configured network key instead of generating one.
    PreCfgKeysEnableItem, 0x0063, "pre-configured keys enable"
);

flag_item!(
    /// Deliver ZDO responses as callbacks instead of passing them to the host.
    ZdoDirectCallbackItem, 0x008F, "ZDO direct callback"
);

flag_item!(
    /// Use the default trust-centre link key for every device.
    UseDefaultTclkItem, 0x006D, "use default TCLK"
);

/// The network key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreCfgKeyItem {
    pub network_key: NetworkKey,
}

impl Payload for PreCfgKeyItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_slice(self.network_key.as_bytes());
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(PreCfgKeyItem {
            network_key: NetworkKey(reader.array()?),
        })
    }
}

impl NvItem for PreCfgKeyItem {
    const ITEM_ID: u16 = 0x0062;
    const NAME: &'static str = "pre-configured key";
}

/// First entry of the trust-centre link-key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TclkTableStartItem {
    pub address: IeeeAddress,
    pub link_key: NetworkKey,
    pub tx_frame_counter: u32,
    pub rx_frame_counter: u32,
}

impl TclkTableStartItem {
    /// Wildcard entry applying the well-known default key to every device.
    pub fn default_for_all_devices() -> Self {
        TclkTableStartItem {
            address: IeeeAddress::BROADCAST,
            link_key: NetworkKey::DEFAULT_TC_LINK_KEY,
            tx_frame_counter: 0,
            rx_frame_counter: 0,
        }
    }
}

impl Payload for TclkTableStartItem {
    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ProtocolError> {
        buf.put_u64_le(self.address.0);
        buf.put_slice(self.link_key.as_bytes());
        buf.put_u32_le(self.tx_frame_counter);
        buf.put_u32_le(self.rx_frame_counter);
        Ok(())
    }

    fn decode(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(TclkTableStartItem {
            address: IeeeAddress(reader.u64()?),
            link_key: NetworkKey(reader.array()?),
            tx_frame_counter: reader.u32()?,
            rx_frame_counter: reader.u32()?,
        })
    }
}

impl NvItem for TclkTableStartItem {
    const ITEM_ID: u16 = 0x0101;
    const NAME: &'static str = "TCLK table start";
}
