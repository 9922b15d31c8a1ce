//! WebSocket signalling channel to the device
//!
//! Owns exactly one connection: opened once, closed once. Every lifecycle
//! outcome is reported asynchronously through [`ChannelEvent`]s; `open`
//! never fails synchronously, because the transport handshake itself is
//! asynchronous. There is no retry; a failed channel stays failed.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace};

/// Lifecycle and traffic events delivered to the channel owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The transport handshake completed; queued sends are now flushing.
    Open,
    /// One inbound text frame, undecoded.
    Message(String),
    /// The connection finished with a close handshake.
    Closed { code: Option<u16>, reason: String },
    /// Terminal transport failure. Nothing further will be delivered.
    Failure(String),
}

enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Send half of the signalling connection.
///
/// Cheap to clone; all clones feed the same socket task. Sends are
/// fire-and-forget and safe to call from any callback context, including
/// before the handshake has completed: frames queue until the socket is
/// writable.
#[derive(Clone)]
pub struct SignalingChannel {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl SignalingChannel {
    /// Start connecting to `url` and return the send handle plus the
    /// event stream. The connect attempt is bounded by `connect_timeout`;
    /// its outcome arrives as the first [`ChannelEvent`].
    pub fn open(
        url: String,
        connect_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url, connect_timeout, outbound_rx, event_tx));
        (
            Self {
                outbound: outbound_tx,
            },
            event_rx,
        )
    }

    /// Enqueue one outbound text frame.
    pub fn send(&self, frame: String) {
        if self.outbound.send(OutboundFrame::Text(frame)).is_err() {
            trace!("dropping send on a finished signalling channel");
        }
    }

    /// Request a graceful close. Closing twice is a no-op, not an error.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.outbound.send(OutboundFrame::Close {
            code,
            reason: reason.to_owned(),
        });
    }
}

async fn run_socket(
    url: String,
    connect_timeout: Duration,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
    event_tx: mpsc::UnboundedSender<ChannelEvent>,
) {
    info!("connecting to signalling endpoint: {}", url);
    let socket = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((socket, _response))) => socket,
        Ok(Err(e)) => {
            let _ = event_tx.send(ChannelEvent::Failure(format!(
                "signalling connect failed: {}",
                e
            )));
            return;
        }
        Err(_) => {
            let _ = event_tx.send(ChannelEvent::Failure(format!(
                "signalling connect timed out after {:?}",
                connect_timeout
            )));
            return;
        }
    };

    info!("signalling channel open");
    let _ = event_tx.send(ChannelEvent::Open);

    let (mut sink, mut stream) = socket.split();
    let mut close_sent = false;

    loop {
        tokio::select! {
            frame = outbound_rx.recv() => match frame {
                Some(OutboundFrame::Text(text)) => {
                    trace!("sending signalling frame: {}", text);
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = event_tx.send(ChannelEvent::Failure(format!(
                            "signalling send failed: {}",
                            e
                        )));
                        return;
                    }
                }
                Some(OutboundFrame::Close { code, reason }) => {
                    if close_sent {
                        continue;
                    }
                    close_sent = true;
                    debug!("closing signalling channel: {} {}", code, reason);
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    if sink.send(Message::Close(Some(frame))).await.is_err() {
                        // Socket already torn down under us; close was
                        // best-effort anyway.
                        return;
                    }
                    // Keep reading until the peer acknowledges the close.
                }
                None => {
                    // Every send handle is gone without a close(); just stop.
                    return;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    trace!("signalling frame received: {}", text);
                    let _ = event_tx.send(ChannelEvent::Message(text));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    info!("signalling channel closed: code={:?} reason={}", code, reason);
                    let _ = event_tx.send(ChannelEvent::Closed { code, reason });
                    return;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    // Pong replies are queued by tungstenite during the read
                    // and ride out with the next write.
                }
                Some(Ok(_)) => {
                    // Binary and raw frames are not part of the dialect.
                }
                Some(Err(e)) => {
                    let _ = event_tx.send(ChannelEvent::Failure(format!(
                        "signalling read error: {}",
                        e
                    )));
                    return;
                }
                None => {
                    if close_sent {
                        debug!("signalling socket finished after local close");
                        let _ = event_tx.send(ChannelEvent::Closed {
                            code: None,
                            reason: String::new(),
                        });
                    } else {
                        let _ = event_tx.send(ChannelEvent::Failure(
                            "signalling socket closed unexpectedly".to_owned(),
                        ));
                    }
                    return;
                }
            },
        }
    }
}
