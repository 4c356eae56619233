//! Message payloads, grouped per firmware subsystem.

/// Implements a reply whose only field is a status byte.
macro_rules! status_reply {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name {
            /// Status reported by the firmware.
            pub status: $crate::ZStackStatus,
        }

        impl $crate::Payload for $name {
            fn encode(&self, buf: &mut Vec<u8>) -> Result<(), $crate::ProtocolError> {
                buf.push(self.status.0);
                Ok(())
            }

            fn decode(reader: &mut $crate::Reader<'_>) -> Result<Self, $crate::ProtocolError> {
                Ok($name {
                    status: $crate::ZStackStatus(reader.u8()?),
                })
            }
        }

        impl $crate::ZStackMessage for $name {
            const KIND: $crate::MessageKind = $crate::MessageKind::$kind;

            fn status(&self) -> Option<$crate::ZStackStatus> {
                Some(self.status)
            }
        }
    };
}

/// Implements a message without payload bytes.
macro_rules! empty_message {
    ($(#[$meta:meta])* $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl $crate::Payload for $name {
            fn encode(&self, _buf: &mut Vec<u8>) -> Result<(), $crate::ProtocolError> {
                Ok(())
            }

            fn decode(_reader: &mut $crate::Reader<'_>) -> Result<Self, $crate::ProtocolError> {
                Ok($name)
            }
        }

        impl $crate::ZStackMessage for $name {
            const KIND: $crate::MessageKind = $crate::MessageKind::$kind;
        }
    };
}

// Declared after the macros so they are in textual scope for each subsystem.
mod af;
mod sapi;
mod sys;
mod util;
mod zdo;

pub use af::*;
pub use sapi::*;
pub use sys::*;
pub use util::*;
pub use zdo::*;
