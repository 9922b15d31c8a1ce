//! Connection configuration for the streaming link

use std::time::Duration;

use crate::signaling::protocol::CallOptions;

/// Signalling port the device firmware listens on out of the box.
pub const DEFAULT_SIGNALLING_PORT: u16 = 9002;

/// Well-known public STUN server, for deployments where the device is not
/// on the same LAN as the operator.
pub const GOOGLE_STUN_SERVER: &str = "stun:stun.1.google.com:19302";

/// Path of the WebRTC signalling endpoint served by the device.
const SIGNALLING_PATH: &str = "/stream/webrtc";

/// Configuration for one streaming session.
///
/// The defaults reproduce the stock device setup: plain `ws://`, a 5 second
/// transport handshake deadline, host-only ICE (no STUN), hardware video
/// encoding and trickle ICE requested in the call options.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Use `wss://` instead of `ws://` for the signalling connection.
    pub secure: bool,

    /// How long the WebSocket handshake may take before the connection
    /// attempt is reported as failed. Bounds only the handshake; waiting
    /// for the remote offer is unbounded.
    pub connect_timeout: Duration,

    /// STUN server URLs handed to the media engine. Empty means host
    /// candidates only, which is enough on a shared LAN.
    pub stun_servers: Vec<String>,

    /// Options sent with the initial call request.
    pub call_options: CallOptions,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            secure: false,
            connect_timeout: Duration::from_secs(5),
            stun_servers: Vec::new(),
            call_options: CallOptions::default(),
        }
    }
}

impl StreamConfig {
    /// Switch the signalling connection to `wss://`.
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Replace the transport handshake deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Add a STUN server for candidate gathering.
    pub fn with_stun_server(mut self, url: impl Into<String>) -> Self {
        self.stun_servers.push(url.into());
        self
    }

    /// Replace the call options sent with the call request.
    pub fn with_call_options(mut self, options: CallOptions) -> Self {
        self.call_options = options;
        self
    }

    /// The signalling endpoint URL for a device address and port.
    pub fn signalling_url(&self, host: &str, port: u16) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, host, port, SIGNALLING_PATH)
    }
}
