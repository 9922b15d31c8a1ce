//! Session negotiation
//!
//! The state machine that turns signalling traffic and engine callbacks
//! into a connected media session.

pub mod negotiator;

pub use negotiator::{NegotiationState, SessionEvent, SessionNegotiator};
