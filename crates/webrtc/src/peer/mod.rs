//! Media-engine seam
//!
//! The negotiator drives the engine through [`MediaSession`] and hears back
//! through [`MediaEvent`]s on a channel: one explicit enum instead of wide
//! observer interfaces with empty default overrides, so an unhandled
//! callback is a visible match arm rather than a silent omission.

pub mod client_peer;

pub use client_peer::ClientPeer;

use async_trait::async_trait;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

use crate::error::Result;
use crate::signaling::protocol::{IceCandidateDescriptor, SessionDescriptor};

/// What a remote stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// Handle for a remote media stream surfaced to the application.
///
/// Identification only: the live RTP track and its decoded frames stay
/// inside the engine, where the rendering surface consumes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    /// Stream identifier assigned by the device.
    pub id: String,
    pub kind: MediaKind,
}

/// Events emitted by the media engine while a session is being set up.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The engine gathered one local transport candidate.
    LocalCandidate(IceCandidateDescriptor),
    /// The engine finished gathering local candidates.
    LocalCandidatesDone,
    /// A remote media stream is ready for the renderer.
    StreamReady(RemoteStream),
    /// ICE transport state change.
    IceState(RTCIceConnectionState),
    /// Overall engine connection state change; `Failed` ends the session.
    EngineState(RTCPeerConnectionState),
}

/// The engine's offer/answer/ICE surface, as the negotiator sees it.
///
/// Exactly one implementor runs in production ([`ClientPeer`], backed by
/// webrtc-rs); tests drive the negotiator with a scripted stand-in.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Apply the remote peer's session description.
    async fn set_remote_description(&self, descriptor: SessionDescriptor) -> Result<()>;

    /// Apply our own session description.
    async fn set_local_description(&self, descriptor: SessionDescriptor) -> Result<()>;

    /// Synthesize the local answer to a previously applied remote offer.
    async fn create_answer(&self) -> Result<SessionDescriptor>;

    /// Feed one remote candidate into the transport. Only valid once the
    /// remote description has been applied.
    async fn add_ice_candidate(&self, candidate: IceCandidateDescriptor) -> Result<()>;

    /// Release the engine session. Idempotent.
    async fn close(&self) -> Result<()>;
}
