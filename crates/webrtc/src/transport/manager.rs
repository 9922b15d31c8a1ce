//! The connect/cleanup lifecycle
//!
//! `connect` spawns one session loop that owns the channel, the engine
//! session, and the negotiator. Every channel event and engine callback is
//! dispatched serially on that loop, so the negotiator never needs a lock.
//! `cleanup` stops the loop and is safe to call at any point, any number
//! of times.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::peer::{ClientPeer, RemoteStream};
use crate::session::{SessionEvent, SessionNegotiator};
use crate::signaling::channel::SignalingChannel;
use crate::signaling::protocol;

/// Notifications surfaced to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The device's media stream is flowing and ready to render.
    StreamReady(RemoteStream),
    /// The session is over, with a human-readable reason. At most one of
    /// these is delivered per connection.
    ConnectionFailed(String),
}

/// WebSocket close code for a deliberate teardown.
const CLOSE_NORMAL: u16 = 1000;

/// Capacity of the engine callback channel.
const MEDIA_EVENT_BUFFER: usize = 64;

/// Capacity of the application notification channel.
const STREAM_EVENT_BUFFER: usize = 16;

/// Owns one streaming session end to end.
///
/// One instance manages at most one session; the media-session handle and
/// the signalling channel are never shared between instances.
pub struct ConnectionManager {
    config: StreamConfig,
    control: Option<mpsc::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            control: None,
            task: None,
        }
    }

    /// Open the signalling channel, build the media session, and send the
    /// call request. Returns immediately; connection progress and failures
    /// arrive on the returned receiver.
    pub fn connect(
        &mut self,
        address: &str,
        signalling_port: u16,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        if self.control.is_some() {
            return Err(Error::AlreadyConnected);
        }
        let url = self.config.signalling_url(address, signalling_port);
        let (events_tx, events_rx) = mpsc::channel(STREAM_EVENT_BUFFER);
        let (control_tx, control_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_session(
            self.config.clone(),
            url,
            control_rx,
            events_tx,
        ));
        self.control = Some(control_tx);
        self.task = Some(task);
        Ok(events_rx)
    }

    /// Tear the session down: close the media session, close the channel,
    /// stop the loop. Safe to call even if `connect` never ran or never
    /// completed, and calling it twice is a no-op.
    pub async fn cleanup(&mut self) {
        if let Some(control) = self.control.take() {
            // A send failure just means the loop already exited.
            let _ = control.send(()).await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                debug!("session loop join: {}", e);
            }
        }
    }
}

async fn run_session(
    config: StreamConfig,
    url: String,
    mut control_rx: mpsc::Receiver<()>,
    events_tx: mpsc::Sender<StreamEvent>,
) {
    let (channel, mut channel_rx) = SignalingChannel::open(url, config.connect_timeout);
    let (media_tx, mut media_rx) = mpsc::channel(MEDIA_EVENT_BUFFER);

    let session = match ClientPeer::new(&config, media_tx).await {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("failed to create media session: {}", e);
            forward(
                &events_tx,
                StreamEvent::ConnectionFailed(format!("failed to create media session: {}", e)),
            )
            .await;
            channel.close(CLOSE_NORMAL, "setup failed");
            return;
        }
    };

    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
    let mut negotiator = SessionNegotiator::new(session, signal_tx, config.call_options.clone());

    if let Err(e) = negotiator.send_call_request() {
        error!("failed to send call request: {}", e);
        forward(
            &events_tx,
            StreamEvent::ConnectionFailed(format!("failed to send call request: {}", e)),
        )
        .await;
        negotiator.shutdown().await;
        channel.close(CLOSE_NORMAL, "setup failed");
        return;
    }

    loop {
        tokio::select! {
            _ = control_rx.recv() => {
                info!("tearing down streaming session");
                negotiator.shutdown().await;
                channel.close(CLOSE_NORMAL, "client shutdown");
                break;
            }
            Some(message) = signal_rx.recv() => {
                match protocol::encode(&message) {
                    Ok(frame) => channel.send(frame),
                    Err(e) => warn!("failed to encode outbound envelope: {}", e),
                }
            }
            Some(event) = channel_rx.recv() => {
                if let Some(notification) = negotiator.dispatch(SessionEvent::Channel(event)).await {
                    forward(&events_tx, notification).await;
                }
            }
            Some(event) = media_rx.recv() => {
                if let Some(notification) = negotiator.dispatch(SessionEvent::Media(event)).await {
                    forward(&events_tx, notification).await;
                }
            }
        }
    }
}

async fn forward(events_tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) {
    if events_tx.send(event).await.is_err() {
        debug!("application dropped the event receiver");
    }
}
