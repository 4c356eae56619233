//! SAPI subsystem: stack start-up.

empty_message!(
    /// Start the Zigbee stack with the persisted configuration.
    SapiZbStartRequest => SapiZbStartRequest
);

empty_message!(
    /// Immediate acknowledgement of [`SapiZbStartRequest`]. The outcome is
    /// reported later through `ZDO_STATE_CHANGE_IND`.
    SapiZbStartRequestReply => SapiZbStartRequestReply
);
