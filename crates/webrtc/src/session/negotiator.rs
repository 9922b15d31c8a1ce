//! The offer/answer/ICE state machine
//!
//! The device cannot be dialled directly: we ask it to call us, it answers
//! with an `offer`, we apply that and return an `answer`, then both sides
//! trickle ICE candidates until the transport comes up. This module owns
//! that exchange; every signalling frame and engine callback funnels
//! through [`SessionNegotiator::dispatch`], serially.
//!
//! One ordering subtlety the wire protocol forces on us: the device may
//! start trickling candidates before its offer has been applied locally,
//! and a candidate is invalid against a session with no remote
//! description. Such candidates are buffered and applied, in receipt
//! order, the moment the remote description lands.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

use crate::error::{Error, Result};
use crate::peer::{MediaEvent, MediaSession};
use crate::signaling::channel::ChannelEvent;
use crate::signaling::protocol::{
    self, CallOptions, IceCandidateDescriptor, MessageKind, SdpKind, SignalMessage,
};
use crate::transport::StreamEvent;

/// Where the negotiation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    /// Constructed, nothing sent yet
    Idle,
    /// Call request sent, device has not offered yet
    AwaitingRemoteOffer,
    /// Offer received; applying it, answering, exchanging candidates
    AnsweringOffer,
    /// The engine reported a ready media stream
    Connected,
    /// Terminal: transport or engine failure, reported once
    Failed,
    /// Terminal: torn down by `shutdown`
    Closed,
}

impl NegotiationState {
    fn is_terminal(self) -> bool {
        matches!(self, NegotiationState::Failed | NegotiationState::Closed)
    }
}

/// Everything the negotiator reacts to, behind one dispatch function.
#[derive(Debug)]
pub enum SessionEvent {
    Channel(ChannelEvent),
    Media(MediaEvent),
}

/// Drives one media session from call request to connected stream.
///
/// Owns the media-session handle for its lifetime. Outbound envelopes
/// leave through the sender handed to [`SessionNegotiator::new`]; the
/// connection manager routes them onto the signalling channel.
pub struct SessionNegotiator {
    state: NegotiationState,
    session: Arc<dyn MediaSession>,
    outbound: mpsc::UnboundedSender<SignalMessage>,
    call_options: CallOptions,
    /// Remote candidates that arrived before the remote description.
    pending_candidates: Vec<IceCandidateDescriptor>,
    remote_description_set: bool,
}

impl SessionNegotiator {
    pub fn new(
        session: Arc<dyn MediaSession>,
        outbound: mpsc::UnboundedSender<SignalMessage>,
        call_options: CallOptions,
    ) -> Self {
        Self {
            state: NegotiationState::Idle,
            session,
            outbound,
            call_options,
            pending_candidates: Vec::new(),
            remote_description_set: false,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Ask the device to start the call. It responds asynchronously with
    /// an `offer` envelope.
    pub fn send_call_request(&mut self) -> Result<()> {
        if self.state != NegotiationState::Idle {
            return Err(Error::Negotiation(format!(
                "call request already sent (state {:?})",
                self.state
            )));
        }
        let message = SignalMessage::call(&self.call_options)?;
        self.send(message);
        self.state = NegotiationState::AwaitingRemoteOffer;
        info!("call request sent, awaiting remote offer");
        Ok(())
    }

    /// Feed one event through the state machine.
    ///
    /// Returns the application-visible notification the event produced, if
    /// any. Events arriving after a terminal state are silently dropped.
    pub async fn dispatch(&mut self, event: SessionEvent) -> Option<StreamEvent> {
        if self.state.is_terminal() {
            debug!("dropping event in {:?}: {:?}", self.state, event);
            return None;
        }
        match event {
            SessionEvent::Channel(event) => self.on_channel_event(event).await,
            SessionEvent::Media(event) => self.on_media_event(event).await,
        }
    }

    /// Tear the session down. No event is processed after this returns.
    pub async fn shutdown(&mut self) {
        if self.state == NegotiationState::Closed {
            return;
        }
        self.state = NegotiationState::Closed;
        self.pending_candidates.clear();
        if let Err(e) = self.session.close().await {
            debug!("media session close during shutdown: {}", e);
        }
    }

    async fn on_channel_event(&mut self, event: ChannelEvent) -> Option<StreamEvent> {
        match event {
            ChannelEvent::Open => {
                debug!("signalling channel reported open");
                None
            }
            ChannelEvent::Message(frame) => self.on_frame(&frame).await,
            ChannelEvent::Closed { code, reason } => {
                info!(
                    "signalling channel closed by peer: code={:?} reason={}",
                    code, reason
                );
                None
            }
            ChannelEvent::Failure(message) => {
                self.fail(format!("signalling transport failed: {}", message))
            }
        }
    }

    async fn on_frame(&mut self, frame: &str) -> Option<StreamEvent> {
        let message = match protocol::decode(frame) {
            Ok(message) => message,
            Err(e) => {
                // A single garbled frame does not abort the session.
                warn!("ignoring bad signalling frame: {}", e);
                return None;
            }
        };
        match message.what {
            MessageKind::Offer => self.on_offer(&message).await,
            MessageKind::IceCandidate => self.on_remote_candidate(&message).await,
            MessageKind::Message => {
                info!("device message: {}", message.data);
                None
            }
            MessageKind::Call | MessageKind::Answer => {
                warn!("unexpected inbound {:?} envelope dropped", message.what);
                None
            }
        }
    }

    async fn on_offer(&mut self, message: &SignalMessage) -> Option<StreamEvent> {
        if self.state != NegotiationState::AwaitingRemoteOffer {
            warn!(
                "offer received in {:?}, ignored: renegotiation is not supported",
                self.state
            );
            return None;
        }
        let descriptor = match message.session_descriptor() {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!("ignoring offer with undecodable payload: {}", e);
                return None;
            }
        };
        if descriptor.kind != SdpKind::Offer {
            warn!("offer envelope carried a {:?} descriptor, ignored", descriptor.kind);
            return None;
        }

        self.state = NegotiationState::AnsweringOffer;
        debug!("applying remote offer ({} bytes of sdp)", descriptor.sdp.len());
        if let Err(e) = self.session.set_remote_description(descriptor).await {
            return self.fail(format!("failed to apply remote offer: {}", e));
        }
        self.remote_description_set = true;
        self.flush_pending_candidates().await;

        let answer = match self.session.create_answer().await {
            Ok(answer) => answer,
            Err(e) => return self.fail(format!("failed to create answer: {}", e)),
        };

        // The answer goes on the wire before the local-description set is
        // confirmed; the device cannot act on it before receiving it.
        match SignalMessage::answer(&answer) {
            Ok(envelope) => self.send(envelope),
            Err(e) => return self.fail(format!("failed to encode answer: {}", e)),
        }
        info!("answer sent");

        if let Err(e) = self.session.set_local_description(answer).await {
            return self.fail(format!("failed to set local description: {}", e));
        }
        None
    }

    async fn on_remote_candidate(&mut self, message: &SignalMessage) -> Option<StreamEvent> {
        match message.candidate() {
            Some(candidate) => {
                if self.remote_description_set {
                    self.apply_remote_candidate(candidate).await;
                } else {
                    debug!("buffering remote candidate that arrived ahead of the offer");
                    self.pending_candidates.push(candidate);
                }
            }
            None => {
                // In-band signal, not an error: the device is done trickling.
                debug!("device finished sending trickle candidates");
            }
        }
        None
    }

    async fn flush_pending_candidates(&mut self) {
        if self.pending_candidates.is_empty() {
            return;
        }
        debug!(
            "applying {} buffered remote candidate(s)",
            self.pending_candidates.len()
        );
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.apply_remote_candidate(candidate).await;
        }
    }

    async fn apply_remote_candidate(&mut self, candidate: IceCandidateDescriptor) {
        if let Err(e) = self.session.add_ice_candidate(candidate).await {
            // One bad candidate does not end an otherwise healthy session.
            warn!("failed to add remote candidate: {}", e);
        }
    }

    async fn on_media_event(&mut self, event: MediaEvent) -> Option<StreamEvent> {
        match event {
            MediaEvent::LocalCandidate(candidate) => {
                match SignalMessage::ice_candidate(&candidate) {
                    Ok(envelope) => self.send(envelope),
                    Err(e) => warn!("failed to encode local candidate: {}", e),
                }
                None
            }
            MediaEvent::LocalCandidatesDone => {
                debug!("local candidate gathering complete");
                None
            }
            MediaEvent::StreamReady(stream) => {
                if self.state != NegotiationState::Connected {
                    info!("media stream ready: id={} kind={:?}", stream.id, stream.kind);
                    self.state = NegotiationState::Connected;
                }
                Some(StreamEvent::StreamReady(stream))
            }
            MediaEvent::IceState(state) => {
                debug!("ice connection state: {:?}", state);
                None
            }
            MediaEvent::EngineState(state) => {
                debug!("engine connection state: {:?}", state);
                if state == RTCPeerConnectionState::Failed {
                    return self.fail("media engine reported connection failure".to_owned());
                }
                None
            }
        }
    }

    fn fail(&mut self, message: String) -> Option<StreamEvent> {
        warn!("session failed: {}", message);
        self.state = NegotiationState::Failed;
        Some(StreamEvent::ConnectionFailed(message))
    }

    fn send(&self, message: SignalMessage) {
        if self.outbound.send(message).is_err() {
            debug!("outbound signalling sink is gone, envelope dropped");
        }
    }
}
