//! Message kinds.
//!
//! Every payload struct is tagged with a [`MessageKind`]. The driver's
//! registry maps kinds to frame identities, so dispatch never needs to inspect
//! the concrete Rust type at runtime.

use crate::codec::Payload;
use crate::status::ZStackStatus;

/// Tag naming each known payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    SysResetRequest,
    SysResetIndication,
    SysGetExtAddr,
    SysGetExtAddrReply,
    SysOsalNvRead,
    SysOsalNvReadReply,
    SysOsalNvWrite,
    SysOsalNvWriteReply,
    SapiZbStartRequest,
    SapiZbStartRequestReply,
    UtilGetDeviceInfo,
    UtilGetDeviceInfoReply,
    AfRegister,
    AfRegisterReply,
    AfDataRequest,
    AfDataRequestReply,
    AfDataConfirm,
    AfIncomingMsg,
    ZdoNwkAddrReq,
    ZdoNwkAddrReqReply,
    ZdoNwkAddrRsp,
    ZdoMgmtLeaveReq,
    ZdoMgmtLeaveReqReply,
    ZdoMgmtLeaveRsp,
    ZdoMgmtPermitJoinReq,
    ZdoMgmtPermitJoinReqReply,
    ZdoStateChangeInd,
    ZdoEndDeviceAnnceInd,
    ZdoLeaveInd,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: &'static [MessageKind] = &[
        MessageKind::SysResetRequest,
        MessageKind::SysResetIndication,
        MessageKind::SysGetExtAddr,
        MessageKind::SysGetExtAddrReply,
        MessageKind::SysOsalNvRead,
        MessageKind::SysOsalNvReadReply,
        MessageKind::SysOsalNvWrite,
        MessageKind::SysOsalNvWriteReply,
        MessageKind::SapiZbStartRequest,
        MessageKind::SapiZbStartRequestReply,
        MessageKind::UtilGetDeviceInfo,
        MessageKind::UtilGetDeviceInfoReply,
        MessageKind::AfRegister,
        MessageKind::AfRegisterReply,
        MessageKind::AfDataRequest,
        MessageKind::AfDataRequestReply,
        MessageKind::AfDataConfirm,
        MessageKind::AfIncomingMsg,
        MessageKind::ZdoNwkAddrReq,
        MessageKind::ZdoNwkAddrReqReply,
        MessageKind::ZdoNwkAddrRsp,
        MessageKind::ZdoMgmtLeaveReq,
        MessageKind::ZdoMgmtLeaveReqReply,
        MessageKind::ZdoMgmtLeaveRsp,
        MessageKind::ZdoMgmtPermitJoinReq,
        MessageKind::ZdoMgmtPermitJoinReqReply,
        MessageKind::ZdoStateChangeInd,
        MessageKind::ZdoEndDeviceAnnceInd,
        MessageKind::ZdoLeaveInd,
    ];
}

/// A payload that can travel in a frame.
pub trait ZStackMessage: Payload + Send + 'static {
    /// Kind used to look up the frame identity.
    const KIND: MessageKind;

    /// Status reported by the firmware, for messages that carry one.
    fn status(&self) -> Option<ZStackStatus> {
        None
    }
}
