//! Streaming link to a remote turret device
//!
//! Connects to the device's WebRTC endpoint over its JSON-over-WebSocket
//! signalling dialect, negotiates the media session (offer/answer plus
//! trickle ICE), and surfaces the resulting stream to the application.
//!
//! The media engine itself is the `webrtc` crate; this crate owns the
//! orchestration around it: the wire codec, the signalling channel, the
//! negotiation state machine, and the connect/cleanup lifecycle. Steering
//! the device and rendering the decoded frames live elsewhere.
//!
//! # Example
//!
//! ```no_run
//! use turretlink_webrtc::{ConnectionManager, StreamConfig, StreamEvent};
//!
//! # async fn demo() -> turretlink_webrtc::Result<()> {
//! let mut manager = ConnectionManager::new(StreamConfig::default());
//! let mut events = manager.connect("192.168.1.50", 9002)?;
//! while let Some(event) = events.recv().await {
//!     match event {
//!         StreamEvent::StreamReady(stream) => {
//!             println!("stream {} is up", stream.id);
//!         }
//!         StreamEvent::ConnectionFailed(reason) => {
//!             eprintln!("session over: {}", reason);
//!             break;
//!         }
//!     }
//! }
//! manager.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod transport;

pub use config::{StreamConfig, DEFAULT_SIGNALLING_PORT, GOOGLE_STUN_SERVER};
pub use error::{Error, Result};
pub use peer::{MediaKind, RemoteStream};
pub use session::NegotiationState;
pub use transport::{ConnectionManager, StreamEvent};
