//! Connection management
//!
//! Composes the signalling channel, the media session, and the negotiator
//! behind a single connect/cleanup contract for the application layer.

pub mod manager;

pub use manager::{ConnectionManager, StreamEvent};
