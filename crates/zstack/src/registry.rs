//! Message registry.
//!
//! Maps every [`MessageKind`] to the frame identity it travels under and back.
//! The mapping is a bijection, checked as entries are registered.

use std::collections::HashMap;
use std::fmt;

use zstack_protocol::{MessageKind, ZStackMessage};
use zstack_unpi::{Frame, MessageType, Subsystem};

use crate::error::RegistryError;

/// The `(type, subsystem, command)` triple identifying a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageIdentity {
    pub message_type: MessageType,
    pub subsystem: Subsystem,
    pub command_id: u8,
}

impl MessageIdentity {
    pub const fn new(message_type: MessageType, subsystem: Subsystem, command_id: u8) -> Self {
        MessageIdentity {
            message_type,
            subsystem,
            command_id,
        }
    }

    /// Identity of a received frame.
    pub fn of_frame(frame: &Frame) -> Self {
        MessageIdentity::new(frame.message_type, frame.subsystem, frame.command_id)
    }

    /// Build a frame with this identity.
    pub fn frame(&self, payload: Vec<u8>) -> Frame {
        Frame::new(self.message_type, self.subsystem, self.command_id, payload)
    }
}

impl fmt::Display for MessageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?}/0x{:02x}",
            self.message_type, self.subsystem, self.command_id
        )
    }
}

/// Bidirectional kind/identity lookup.
#[derive(Debug, Default)]
pub struct MessageRegistry {
    by_identity: HashMap<MessageIdentity, MessageKind>,
    by_kind: HashMap<MessageKind, MessageIdentity>,
}

impl MessageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every message this driver exchanges.
    pub fn populate() -> Result<Self, RegistryError> {
        use MessageKind::*;
        use MessageType::{Areq, Sreq, Srsp};
        use Subsystem::{Af, Sapi, Sys, Util, Zdo};

        let entries = [
            (Areq, Sys, 0x00, SysResetRequest),
            (Areq, Sys, 0x80, SysResetIndication),
            (Sreq, Sys, 0x04, SysGetExtAddr),
            (Srsp, Sys, 0x04, SysGetExtAddrReply),
            (Sreq, Sys, 0x08, SysOsalNvRead),
            (Srsp, Sys, 0x08, SysOsalNvReadReply),
            (Sreq, Sys, 0x09, SysOsalNvWrite),
            (Srsp, Sys, 0x09, SysOsalNvWriteReply),
            (Sreq, Sapi, 0x00, SapiZbStartRequest),
            (Srsp, Sapi, 0x00, SapiZbStartRequestReply),
            (Sreq, Util, 0x00, UtilGetDeviceInfo),
            (Srsp, Util, 0x00, UtilGetDeviceInfoReply),
            (Sreq, Af, 0x00, AfRegister),
            (Srsp, Af, 0x00, AfRegisterReply),
            (Sreq, Af, 0x01, AfDataRequest),
            (Srsp, Af, 0x01, AfDataRequestReply),
            (Areq, Af, 0x80, AfDataConfirm),
            (Areq, Af, 0x81, AfIncomingMsg),
            (Sreq, Zdo, 0x00, ZdoNwkAddrReq),
            (Srsp, Zdo, 0x00, ZdoNwkAddrReqReply),
            (Areq, Zdo, 0x80, ZdoNwkAddrRsp),
            (Sreq, Zdo, 0x34, ZdoMgmtLeaveReq),
            (Srsp, Zdo, 0x34, ZdoMgmtLeaveReqReply),
            (Areq, Zdo, 0xB4, ZdoMgmtLeaveRsp),
            (Sreq, Zdo, 0x36, ZdoMgmtPermitJoinReq),
            (Srsp, Zdo, 0x36, ZdoMgmtPermitJoinReqReply),
            (Areq, Zdo, 0xC0, ZdoStateChangeInd),
            (Areq, Zdo, 0xC1, ZdoEndDeviceAnnceInd),
            (Areq, Zdo, 0xC9, ZdoLeaveInd),
        ];

        let mut registry = MessageRegistry::new();
        for (message_type, subsystem, command_id, kind) in entries {
            registry.register(MessageIdentity::new(message_type, subsystem, command_id), kind)?;
        }
        Ok(registry)
    }

    /// Register a kind under an identity. Neither may already be registered.
    pub fn register(
        &mut self,
        identity: MessageIdentity,
        kind: MessageKind,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.by_identity.get(&identity) {
            return Err(RegistryError::DuplicateIdentity {
                identity,
                existing: *existing,
            });
        }
        if let Some(existing) = self.by_kind.get(&kind) {
            return Err(RegistryError::DuplicateKind {
                kind,
                existing: *existing,
            });
        }

        self.by_identity.insert(identity, kind);
        self.by_kind.insert(kind, identity);
        Ok(())
    }

    pub fn lookup_by_identity(&self, identity: &MessageIdentity) -> Option<MessageKind> {
        self.by_identity.get(identity).copied()
    }

    pub fn lookup_by_kind(&self, kind: MessageKind) -> Option<MessageIdentity> {
        self.by_kind.get(&kind).copied()
    }

    /// Identity of a message value, derived from its type alone.
    pub fn identity_of<M: ZStackMessage>(&self, _message: &M) -> Option<MessageIdentity> {
        self.lookup_by_kind(M::KIND)
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    /// All registered pairs, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (MessageKind, MessageIdentity)> + '_ {
        self.by_kind.iter().map(|(kind, identity)| (*kind, *identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zstack_protocol::{ResetType, SysResetReq};

    #[test]
    fn test_populate_covers_every_kind() {
        let registry = MessageRegistry::populate().unwrap();
        assert_eq!(registry.len(), MessageKind::ALL.len());
        for kind in MessageKind::ALL {
            assert!(registry.lookup_by_kind(*kind).is_some(), "{:?} missing", kind);
        }
    }

    #[test]
    fn test_lookups_are_inverse() {
        let registry = MessageRegistry::populate().unwrap();
        for (kind, identity) in registry.entries() {
            assert_eq!(registry.lookup_by_identity(&identity), Some(kind));
            assert_eq!(registry.lookup_by_kind(kind), Some(identity));
        }
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let mut registry = MessageRegistry::new();
        let identity = MessageIdentity::new(MessageType::Sreq, Subsystem::Sys, 0x04);
        registry
            .register(identity, MessageKind::SysGetExtAddr)
            .unwrap();

        let err = registry
            .register(identity, MessageKind::SysOsalNvRead)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateIdentity { .. }));
        assert_eq!(registry.lookup_by_kind(MessageKind::SysOsalNvRead), None);
    }

    #[test]
    fn test_duplicate_kind_rejected() {
        let mut registry = MessageRegistry::new();
        registry
            .register(
                MessageIdentity::new(MessageType::Sreq, Subsystem::Sys, 0x04),
                MessageKind::SysGetExtAddr,
            )
            .unwrap();

        let err = registry
            .register(
                MessageIdentity::new(MessageType::Sreq, Subsystem::Sys, 0x05),
                MessageKind::SysGetExtAddr,
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKind { .. }));
    }

    #[test]
    fn test_identity_of_ignores_instance_data() {
        let registry = MessageRegistry::populate().unwrap();
        let hard = SysResetReq {
            reset_type: ResetType::Hard,
        };
        let soft = SysResetReq {
            reset_type: ResetType::Soft,
        };

        assert_eq!(registry.identity_of(&hard), registry.identity_of(&soft));
        assert_eq!(
            registry.identity_of(&soft),
            Some(MessageIdentity::new(MessageType::Areq, Subsystem::Sys, 0x00))
        );
    }
}
