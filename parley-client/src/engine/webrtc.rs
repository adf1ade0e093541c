use crate::engine::{EngineEvent, EngineFactory, PeerEngine};
use async_trait::async_trait;
use parley_core::{
    LocalTrack, NegotiationError, RemoteTrack, SdpKind, SessionDescription, TrackKind,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone)]
pub struct WebRtcEngineConfig {
    pub ice_servers: Vec<String>,
}

impl Default for WebRtcEngineConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
        }
    }
}

#[async_trait]
impl EngineFactory for WebRtcEngineConfig {
    async fn create(
        &self,
    ) -> Result<(Box<dyn PeerEngine>, mpsc::Receiver<EngineEvent>), NegotiationError> {
        let (engine, events) = WebRtcEngine::new(self.clone()).await?;
        Ok((Box::new(engine), events))
    }
}

/// Native peer-connection engine over the `webrtc` crate.
///
/// Descriptions are exchanged non-trickle: offer and answer creation block
/// until ICE gathering completes, so the SDP handed to signaling is
/// self-contained and the wire protocol needs no candidate events.
pub struct WebRtcEngine {
    pc: Arc<RTCPeerConnection>,
}

impl WebRtcEngine {
    pub async fn new(
        config: WebRtcEngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>), NegotiationError> {
        let mut media = MediaEngine::default();
        media.register_default_codecs().map_err(engine_err)?;

        let registry =
            register_default_interceptors(Registry::new(), &mut media).map_err(engine_err)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }],
            ..Default::default()
        };

        let pc = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .map_err(engine_err)?,
        );

        let (event_tx, event_rx) = mpsc::channel(64);

        let nego_tx = event_tx.clone();
        pc.on_negotiation_needed(Box::new(move || {
            let tx = nego_tx.clone();
            Box::pin(async move {
                debug!("engine raised negotiation-needed");
                let _ = tx.send(EngineEvent::NegotiationNeeded).await;
            })
        }));

        let track_tx = event_tx.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    _ => TrackKind::Video,
                };
                let remote = RemoteTrack {
                    id: track.id(),
                    kind,
                };
                debug!(id = %remote.id, "inbound track");
                let _ = tx.send(EngineEvent::TrackReceived(remote)).await;
            })
        }));

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                debug!(?state, "peer connection state change");
                match state {
                    RTCPeerConnectionState::Failed
                    | RTCPeerConnectionState::Disconnected
                    | RTCPeerConnectionState::Closed => {
                        let _ = tx.send(EngineEvent::Closed).await;
                    }
                    _ => {}
                }
            })
        }));

        Ok((Self { pc }, event_rx))
    }

    /// Wait out ICE gathering and return the candidate-bearing local SDP.
    async fn gathered_local_description(&self) -> Result<RTCSessionDescription, NegotiationError> {
        let mut gathered = self.pc.gathering_complete_promise().await;
        let _ = gathered.recv().await;
        self.pc
            .local_description()
            .await
            .ok_or_else(|| NegotiationError::Engine("no local description after gathering".into()))
    }
}

#[async_trait]
impl PeerEngine for WebRtcEngine {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.pc.create_offer(None).await.map_err(engine_err)?;
        self.pc
            .set_local_description(offer)
            .await
            .map_err(engine_err)?;

        let local = self.gathered_local_description().await?;
        Ok(SessionDescription::offer(local.sdp))
    }

    async fn create_answer(
        &self,
        remote: SessionDescription,
    ) -> Result<SessionDescription, NegotiationError> {
        if remote.kind != SdpKind::Offer {
            return Err(NegotiationError::InvalidRemoteDescription(
                "expected an offer".into(),
            ));
        }

        let offer = RTCSessionDescription::offer(remote.sdp)
            .map_err(|e| NegotiationError::InvalidRemoteDescription(e.to_string()))?;
        self.pc
            .set_remote_description(offer)
            .await
            .map_err(|e| NegotiationError::InvalidRemoteDescription(e.to_string()))?;

        let answer = self.pc.create_answer(None).await.map_err(engine_err)?;
        self.pc
            .set_local_description(answer)
            .await
            .map_err(engine_err)?;

        let local = self.gathered_local_description().await?;
        Ok(SessionDescription::answer(local.sdp))
    }

    async fn apply_remote_answer(
        &self,
        answer: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if answer.kind != SdpKind::Answer {
            return Err(NegotiationError::InvalidRemoteDescription(
                "expected an answer".into(),
            ));
        }

        let desc = RTCSessionDescription::answer(answer.sdp)
            .map_err(|e| NegotiationError::InvalidRemoteDescription(e.to_string()))?;
        self.pc
            .set_remote_description(desc)
            .await
            .map_err(|e| NegotiationError::InvalidRemoteDescription(e.to_string()))?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), NegotiationError> {
        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        self.pc
            .set_local_description(desc)
            .await
            .map_err(engine_err)
    }

    async fn add_track(&self, track: LocalTrack) -> Result<(), NegotiationError> {
        let capability = match track.kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
        };

        let local: Arc<dyn TrackLocal + Send + Sync> = Arc::new(TrackLocalStaticSample::new(
            capability,
            track.id,
            "parley".to_owned(),
        ));

        self.pc.add_track(local).await.map_err(engine_err)?;
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.pc.close().await.map_err(engine_err)
    }
}

fn engine_err(e: webrtc::Error) -> NegotiationError {
    NegotiationError::Engine(e.to_string())
}
