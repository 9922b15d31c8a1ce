//! Wire protocol for the device's signalling dialect
//!
//! Every frame on the signalling socket is a two-field JSON envelope
//! `{"what": ..., "data": ...}` where `data` is itself a JSON-encoded string
//! for structured payloads. The double encoding is required for wire
//! compatibility with the device firmware.
//!
//! Decoding stops at the envelope: `data` is handed to the consumer as-is,
//! because the dialect's "no more candidates" signal is an `iceCandidate`
//! envelope whose payload deliberately fails to parse as a candidate.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Envelope tag naming the payload schema of a [`SignalMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    /// Operator asks the device to start a call (outbound only)
    Call,
    /// Device proposes a session description (inbound only)
    Offer,
    /// Operator accepts with its own description (outbound only)
    Answer,
    /// Free-form informational text, logged and never acted on
    Message,
    /// One trickle ICE candidate, either direction
    IceCandidate,
}

/// The `{what, data}` wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalMessage {
    pub what: MessageKind,
    pub data: String,
}

/// Options carried by the initial call request, immutable once sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    /// Ask the device to use its hardware video encoder.
    pub force_hw_vcodec: bool,
    /// Exchange ICE candidates incrementally instead of in one batch.
    pub trickle_ice: bool,
    /// Raw video format index understood by the device firmware.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vformat: Option<u32>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            force_hw_vcodec: true,
            trickle_ice: true,
            vformat: None,
        }
    }
}

/// Which side of the offer/answer exchange a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// A session description, passed through to the media engine verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// One ICE candidate, exactly as exchanged on the wire.
///
/// A candidate has no identity beyond these three fields: candidates are
/// not deduplicated and carry no ordering beyond wire send order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateDescriptor {
    #[serde(rename = "sdpMid")]
    pub sdp_mid: String,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: u16,
    pub candidate: String,
}

impl SignalMessage {
    /// Build the call request that asks the device to start a session.
    pub fn call(options: &CallOptions) -> Result<Self> {
        Ok(Self {
            what: MessageKind::Call,
            data: serde_json::to_string(options)?,
        })
    }

    /// Wrap a local answer for the wire.
    pub fn answer(descriptor: &SessionDescriptor) -> Result<Self> {
        Ok(Self {
            what: MessageKind::Answer,
            data: serde_json::to_string(descriptor)?,
        })
    }

    /// Wrap a locally gathered candidate for the wire.
    pub fn ice_candidate(candidate: &IceCandidateDescriptor) -> Result<Self> {
        Ok(Self {
            what: MessageKind::IceCandidate,
            data: serde_json::to_string(candidate)?,
        })
    }

    /// Extract the session descriptor embedded in an `offer` or `answer`.
    pub fn session_descriptor(&self) -> Result<SessionDescriptor> {
        serde_json::from_str(&self.data).map_err(|e| Error::MalformedPayload(e.to_string()))
    }

    /// Decode the payload of an `iceCandidate` envelope.
    ///
    /// `None` is the dialect's end-of-candidates signal: the device closes
    /// its trickle with an `iceCandidate` whose data is not a candidate.
    pub fn candidate(&self) -> Option<IceCandidateDescriptor> {
        serde_json::from_str(&self.data).ok()
    }
}

/// Serialize an envelope into a wire frame.
pub fn encode(message: &SignalMessage) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// Parse a wire frame into an envelope.
///
/// Fails with [`Error::MalformedEnvelope`] when the outer JSON is invalid
/// or `what`/`data` are missing or unrecognized. Inner payloads are not
/// validated here.
pub fn decode(frame: &str) -> Result<SignalMessage> {
    serde_json::from_str(frame).map_err(|e| Error::MalformedEnvelope(e.to_string()))
}
