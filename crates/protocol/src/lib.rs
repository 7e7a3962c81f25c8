//! dispatch-protocol: wire types for the device session dispatcher.
//!
//! These types describe the JSON messages that cross the TCP socket between
//! the dispatcher and a device (handshake, command envelope, acknowledgment)
//! plus the physical-device management protocol. Nothing here touches I/O —
//! framing and socket reads live in the `dispatcher` service crate.

mod ack;
mod device_id;
mod envelope;
mod error;
mod handshake;
mod physical;

pub use ack::{LogicalAck, LogicalAckStatus};
pub use device_id::{build_device_id, sub_device_id, DeviceKind};
pub use envelope::Envelope;
pub use error::ProtocolError;
pub use handshake::Handshake;
pub use physical::{PhysicalAck, PhysicalAction, PhysicalCommand, PhysicalStatus};

/// The largest single frame the wire protocol accepts, per §4.3/§6: one JSON
/// object per recv buffer, no length prefix, no continuation across reads.
pub const MAX_FRAME_BYTES: usize = 4096;
