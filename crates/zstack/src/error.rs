//! Error types for the driver.

use thiserror::Error;
use zstack_protocol::{IeeeAddress, MessageKind, ProtocolError, ZStackStatus};

use crate::registry::MessageIdentity;

/// Result alias used throughout the driver.
pub type Result<T> = std::result::Result<T, ZStackError>;

/// Errors returned by driver operations.
#[derive(Debug, Error)]
pub enum ZStackError {
    /// The message kind has no registered frame identity.
    #[error("Unrecognised message: {0:?}")]
    UnrecognisedMessage(MessageKind),

    /// Payload encoding failed.
    #[error("Failed to encode {kind:?}: {source}")]
    Encode {
        kind: MessageKind,
        #[source]
        source: ProtocolError,
    },

    /// Payload decoding failed.
    #[error("Failed to decode {kind:?}: {source}")]
    Decode {
        kind: MessageKind,
        #[source]
        source: ProtocolError,
    },

    /// The caller's deadline passed before the operation completed.
    #[error("Deadline exceeded while {0}")]
    DeadlineExceeded(&'static str),

    /// The adapter reported a non-success status.
    #[error("Adapter reported failure status {0}")]
    DeviceFailure(ZStackStatus),

    /// A bootstrap step failed on every attempt.
    #[error("Failed during {step} after {attempts} attempts: {source}")]
    RetryExhausted {
        step: String,
        attempts: u32,
        #[source]
        source: Box<ZStackError>,
    },

    /// The synchronous reply did not match the request.
    #[error("Unexpected reply: expected {expected}, received {actual}")]
    UnexpectedReply {
        expected: MessageIdentity,
        actual: MessageIdentity,
    },

    /// The stack reached a network state it cannot become a coordinator from.
    #[error("Adapter entered non-coordinator state {0:?}")]
    UnexpectedDeviceState(zstack_protocol::DeviceState),

    /// The node is not in the node table.
    #[error("Node {0} not found")]
    NodeNotFound(IeeeAddress),

    /// The transport channel is closed.
    #[error("Transport closed")]
    TransportClosed,

    /// Registry construction failed.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ZStackError {
    /// Whether the error was caused by a passed deadline, directly or as the
    /// last attempt of a retried step.
    pub fn is_deadline(&self) -> bool {
        match self {
            ZStackError::DeadlineExceeded(_) => true,
            ZStackError::RetryExhausted { source, .. } => source.is_deadline(),
            _ => false,
        }
    }
}

/// Violations of the kind/identity bijection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Identity {identity} already registered for {existing:?}")]
    DuplicateIdentity {
        identity: MessageIdentity,
        existing: MessageKind,
    },

    #[error("Kind {kind:?} already registered as {existing}")]
    DuplicateKind {
        kind: MessageKind,
        existing: MessageIdentity,
    },
}

/// Errors loading driver configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
