//! Z-Stack Unified Network Processor Interface (UNPI)
//!
//! This crate provides the frame model and byte framing used to talk to a
//! Texas Instruments Z-Stack network processor over a serial link.
//!
//! # Protocol Overview
//!
//! Every exchange with the network processor is a frame carrying:
//!
//! - **Message type**: synchronous request (`SREQ`), synchronous reply
//!   (`SRSP`), or asynchronous request/indication (`AREQ`)
//! - **Subsystem**: which part of the firmware handles the command (SYS, AF, ZDO, ...)
//! - **Command id**: the command within the subsystem
//! - **Payload**: opaque bytes, interpreted by higher layers
//!
//! On the wire a frame is delimited as:
//!
//! ```text
//! +------+-----+------+------+-----------------+-----+
//! | 0xFE | LEN | CMD0 | CMD1 | DATA[0..LEN]    | FCS |
//! +------+-----+------+------+-----------------+-----+
//! ```
//!
//! # Example
//!
//! ```rust
//! use zstack_unpi::{Frame, FrameCodec, MessageType, Subsystem};
//!
//! let frame = Frame::new(MessageType::Sreq, Subsystem::Sys, 0x02, vec![]);
//! let bytes = FrameCodec::encode(&frame).unwrap();
//!
//! let mut codec = FrameCodec::new();
//! codec.push(&bytes);
//! assert_eq!(codec.decode().unwrap().unwrap(), frame);
//! ```

mod codec;
mod constants;
mod error;
mod frame;

pub use codec::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
