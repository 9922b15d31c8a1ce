//! Error types for the streaming link

use thiserror::Error;

/// Result type alias for streaming-link operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while establishing or running a session
#[derive(Debug, Error)]
pub enum Error {
    /// Outer signalling envelope could not be decoded
    #[error("malformed signalling envelope: {0}")]
    MalformedEnvelope(String),

    /// Inner `data` payload did not match the schema its `what` declares
    #[error("malformed signalling payload: {0}")]
    MalformedPayload(String),

    /// A signalling payload could not be serialized for the wire
    #[error("signalling encode error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The media engine rejected an operation
    #[error("media engine error: {0}")]
    Engine(#[from] webrtc::Error),

    /// The negotiation cannot proceed from its current state
    #[error("negotiation error: {0}")]
    Negotiation(String),

    /// `connect` was called on a manager that already has a session
    #[error("connection manager already has an active session")]
    AlreadyConnected,
}
