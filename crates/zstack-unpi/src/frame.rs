//! Frame model shared by the transport and the driver.

use crate::error::UnpiError;

/// Message type carried in the top three bits of CMD0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Poll command (used by SPI transports only).
    Poll,
    /// Synchronous request; answered immediately by an `Srsp`.
    Sreq,
    /// Asynchronous request or indication.
    Areq,
    /// Synchronous reply to an `Sreq`.
    Srsp,
}

impl MessageType {
    /// Whether this is a synchronous request expecting an immediate reply.
    pub fn is_synchronous_request(&self) -> bool {
        matches!(self, MessageType::Sreq)
    }
}

impl From<MessageType> for u8 {
    fn from(message_type: MessageType) -> Self {
        match message_type {
            MessageType::Poll => 0x00,
            MessageType::Sreq => 0x01,
            MessageType::Areq => 0x02,
            MessageType::Srsp => 0x03,
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = UnpiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::Poll),
            0x01 => Ok(MessageType::Sreq),
            0x02 => Ok(MessageType::Areq),
            0x03 => Ok(MessageType::Srsp),
            other => Err(UnpiError::UnknownMessageType(other)),
        }
    }
}

/// Firmware subsystem a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Reserved.
    Res0,
    /// System interface (reset, NV memory, versions).
    Sys,
    /// MAC layer.
    Mac,
    /// Network layer.
    Nwk,
    /// Application framework (data requests and incoming messages).
    Af,
    /// Zigbee device objects (discovery, management).
    Zdo,
    /// Simple API.
    Sapi,
    /// Utility interface.
    Util,
    /// Debug interface.
    Debug,
    /// Application interface.
    App,
    /// Application configuration (3.x firmware).
    AppConfig,
    /// Green power (3.x firmware).
    GreenPower,
}

impl From<Subsystem> for u8 {
    fn from(subsystem: Subsystem) -> Self {
        match subsystem {
            Subsystem::Res0 => 0x00,
            Subsystem::Sys => 0x01,
            Subsystem::Mac => 0x02,
            Subsystem::Nwk => 0x03,
            Subsystem::Af => 0x04,
            Subsystem::Zdo => 0x05,
            Subsystem::Sapi => 0x06,
            Subsystem::Util => 0x07,
            Subsystem::Debug => 0x08,
            Subsystem::App => 0x09,
            Subsystem::AppConfig => 0x0F,
            Subsystem::GreenPower => 0x15,
        }
    }
}

impl TryFrom<u8> for Subsystem {
    type Error = UnpiError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Subsystem::Res0),
            0x01 => Ok(Subsystem::Sys),
            0x02 => Ok(Subsystem::Mac),
            0x03 => Ok(Subsystem::Nwk),
            0x04 => Ok(Subsystem::Af),
            0x05 => Ok(Subsystem::Zdo),
            0x06 => Ok(Subsystem::Sapi),
            0x07 => Ok(Subsystem::Util),
            0x08 => Ok(Subsystem::Debug),
            0x09 => Ok(Subsystem::App),
            0x0F => Ok(Subsystem::AppConfig),
            0x15 => Ok(Subsystem::GreenPower),
            other => Err(UnpiError::UnknownSubsystem(other)),
        }
    }
}

/// A single frame exchanged with the network processor.
///
/// The payload is opaque at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Direction/kind of the frame.
    pub message_type: MessageType,
    /// Subsystem handling the command.
    pub subsystem: Subsystem,
    /// Command id within the subsystem.
    pub command_id: u8,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame.
    pub fn new(
        message_type: MessageType,
        subsystem: Subsystem,
        command_id: u8,
        payload: Vec<u8>,
    ) -> Self {
        Frame {
            message_type,
            subsystem,
            command_id,
            payload,
        }
    }

    /// Pack message type and subsystem into the CMD0 byte.
    pub fn cmd0(&self) -> u8 {
        (u8::from(self.message_type) << crate::MESSAGE_TYPE_SHIFT)
            | (u8::from(self.subsystem) & crate::SUBSYSTEM_MASK)
    }
}
