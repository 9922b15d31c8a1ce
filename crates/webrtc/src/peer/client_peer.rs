//! webrtc-rs backed media session
//!
//! ClientPeer is the answering side of the exchange: the device sends the
//! offer, we apply it, answer, and receive the media. Engine callbacks are
//! converted into [`MediaEvent`]s on a channel so the session loop consumes
//! them serially alongside signalling traffic.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

use super::{MediaEvent, MediaKind, MediaSession, RemoteStream};
use crate::config::StreamConfig;
use crate::error::Result;
use crate::signaling::protocol::{IceCandidateDescriptor, SdpKind, SessionDescriptor};

/// Client-side peer connection wrapping the external media engine.
pub struct ClientPeer {
    peer_connection: Arc<RTCPeerConnection>,
}

impl ClientPeer {
    /// Build the engine session and wire its callbacks into `events`.
    pub async fn new(config: &StreamConfig, events: mpsc::Sender<MediaEvent>) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: if config.stun_servers.is_empty() {
                Vec::new()
            } else {
                vec![RTCIceServer {
                    urls: config.stun_servers.clone(),
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let candidate_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let events = candidate_tx.clone();
            Box::pin(async move {
                match candidate {
                    Some(candidate) => match candidate.to_json() {
                        Ok(init) => {
                            let descriptor = IceCandidateDescriptor {
                                sdp_mid: init.sdp_mid.unwrap_or_default(),
                                sdp_mline_index: init.sdp_mline_index.unwrap_or(0),
                                candidate: init.candidate,
                            };
                            if events
                                .send(MediaEvent::LocalCandidate(descriptor))
                                .await
                                .is_err()
                            {
                                debug!("dropping local candidate: session loop is gone");
                            }
                        }
                        Err(e) => warn!("failed to serialize local candidate: {}", e),
                    },
                    None => {
                        let _ = events.send(MediaEvent::LocalCandidatesDone).await;
                    }
                }
            })
        }));

        let track_tx = events.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let events = track_tx.clone();
            Box::pin(async move {
                let kind = if track.kind() == RTPCodecType::Video {
                    MediaKind::Video
                } else {
                    MediaKind::Audio
                };
                let stream = RemoteStream {
                    id: track.stream_id(),
                    kind,
                };
                debug!("remote track arrived: id={} kind={:?}", stream.id, kind);
                let _ = events.send(MediaEvent::StreamReady(stream)).await;
            })
        }));

        let ice_tx = events.clone();
        peer_connection.on_ice_connection_state_change(Box::new(move |state| {
            let events = ice_tx.clone();
            Box::pin(async move {
                let _ = events.send(MediaEvent::IceState(state)).await;
            })
        }));

        let state_tx = events;
        peer_connection.on_peer_connection_state_change(Box::new(move |state| {
            let events = state_tx.clone();
            Box::pin(async move {
                let _ = events.send(MediaEvent::EngineState(state)).await;
            })
        }));

        Ok(Self { peer_connection })
    }
}

fn to_engine_description(descriptor: SessionDescriptor) -> Result<RTCSessionDescription> {
    let description = match descriptor.kind {
        SdpKind::Offer => RTCSessionDescription::offer(descriptor.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(descriptor.sdp)?,
    };
    Ok(description)
}

#[async_trait::async_trait]
impl MediaSession for ClientPeer {
    async fn set_remote_description(&self, descriptor: SessionDescriptor) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_engine_description(descriptor)?)
            .await?;
        Ok(())
    }

    async fn set_local_description(&self, descriptor: SessionDescriptor) -> Result<()> {
        self.peer_connection
            .set_local_description(to_engine_description(descriptor)?)
            .await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescriptor> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescriptor {
            kind: SdpKind::Answer,
            sdp: answer.sdp,
        })
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateDescriptor) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: Some(candidate.sdp_mid),
            sdp_mline_index: Some(candidate.sdp_mline_index),
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
