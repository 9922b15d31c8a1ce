//! Signalling for the device's WebRTC endpoint
//!
//! Two pieces: the wire codec for the `{what, data}` JSON dialect, and the
//! WebSocket channel that carries those frames to and from the device.

pub mod channel;
pub mod protocol;

pub use channel::{ChannelEvent, SignalingChannel};
pub use protocol::{
    CallOptions, IceCandidateDescriptor, MessageKind, SdpKind, SessionDescriptor, SignalMessage,
};
