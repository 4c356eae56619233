//! Z-Stack Monitor and Test (MT) API payloads
//!
//! This crate defines the structured payloads exchanged with a Z-Stack network
//! processor and the little-endian codec that turns them into frame payload
//! bytes. It knows nothing about frames or transports; the driver pairs each
//! [`MessageKind`] with a frame identity.
//!
//! # Layout
//!
//! - [`types`]: addressing vocabulary (IEEE/network addresses, endpoints, clusters)
//! - [`codec`]: the [`Payload`] trait and byte reader/writer helpers
//! - message structs grouped per firmware subsystem (SYS, SAPI, UTIL, AF, ZDO)
//! - [`nv`]: persisted configuration items and their encodings
//!
//! # Example
//!
//! ```rust
//! use zstack_protocol::{IeeeAddress, NetworkAddress, Payload, ZdoMgmtLeaveRsp};
//!
//! let rsp = ZdoMgmtLeaveRsp::from_bytes(&[0x00, 0x40, 0x00]).unwrap();
//! assert_eq!(rsp.source_address, NetworkAddress(0x4000));
//! assert!(rsp.status.is_success());
//! ```

pub mod codec;
mod error;
mod kind;
mod messages;
pub mod nv;
mod status;
pub mod types;

pub use codec::{Payload, Reader};
pub use error::*;
pub use kind::*;
pub use messages::*;
pub use status::*;
pub use types::*;
