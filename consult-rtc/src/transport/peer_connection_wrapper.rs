use crate::media::{
    CaptureRequest, LocalMedia, LocalTrack, MediaError, MediaSource, RemoteTrack, TrackKind,
};
use crate::transport::{NegotiationState, PeerError, PeerEvent, PeerSession, TransportConfig};
use async_trait::async_trait;
use consult_core::{ConnectionState, IceCandidate, SdpKind, SessionDescription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;

/// [`PeerSession`] over a webrtc-rs `RTCPeerConnection`.
pub struct PeerConnectionWrapper {
    config: TransportConfig,
    media_source: Arc<dyn MediaSource>,
    stream_id: String,
    connection: OnceLock<Arc<RTCPeerConnection>>,
    local_media: OnceLock<LocalMedia>,
    senders: Mutex<Vec<(TrackKind, Arc<RTCRtpSender>)>>,
    closed: AtomicBool,
}

impl PeerConnectionWrapper {
    pub fn new(config: TransportConfig, media_source: Arc<dyn MediaSource>) -> Self {
        Self {
            config,
            media_source,
            stream_id: format!("stream-{}", uuid::Uuid::new_v4().simple()),
            connection: OnceLock::new(),
            local_media: OnceLock::new(),
            senders: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn connection(&self) -> Result<&Arc<RTCPeerConnection>, PeerError> {
        self.connection.get().ok_or(PeerError::NotInitialized)
    }

    async fn build_connection(&self) -> Result<Arc<RTCPeerConnection>, PeerError> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let mut settings = SettingEngine::default();
        settings.set_include_loopback_candidate(self.config.include_loopback_candidates);

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .with_setting_engine(settings)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: self
                .config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ice_candidate_pool_size: self.config.candidate_pool_size,
            ..Default::default()
        };

        Ok(Arc::new(api.new_peer_connection(rtc_config).await?))
    }

    fn wire_events(peer_connection: &RTCPeerConnection, event_tx: mpsc::Sender<PeerEvent>) {
        let track_tx = event_tx.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();

            Box::pin(async move {
                let Some(remote) = RemoteTrack::from_native(track) else {
                    warn!("Ignoring remote track of unknown kind");
                    return;
                };
                info!(
                    "Remote {} track {} arrived on stream {}",
                    remote.kind, remote.id, remote.stream_id
                );
                let _ = tx.send(PeerEvent::RemoteTrack(remote)).await;
            })
        }));

        let state_tx = event_tx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();

                Box::pin(async move {
                    info!("Peer connection state changed: {}", s);
                    if let Some(state) = map_connection_state(s) {
                        let _ = tx.send(PeerEvent::ConnectionStateChanged(state)).await;
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(PeerEvent::CandidateGenerated(IceCandidate {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_m_line_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    }))
                    .await;
            })
        }));

        let negotiation_tx = event_tx.clone();
        peer_connection.on_negotiation_needed(Box::new(move || {
            let tx = negotiation_tx.clone();

            Box::pin(async move {
                debug!("Negotiation needed");
                let _ = tx.send(PeerEvent::NegotiationNeeded).await;
            })
        }));

        let signaling_tx = event_tx;
        peer_connection.on_signaling_state_change(Box::new(move |s: RTCSignalingState| {
            let tx = signaling_tx.clone();

            Box::pin(async move {
                debug!("Signaling state changed: {}", s);
                let _ = tx
                    .send(PeerEvent::SignalingStateChanged(NegotiationState::from(s)))
                    .await;
            })
        }));

        peer_connection.on_ice_connection_state_change(Box::new(
            move |s: RTCIceConnectionState| {
                Box::pin(async move {
                    debug!("ICE connection state changed: {}", s);
                })
            },
        ));

        peer_connection.on_ice_gathering_state_change(Box::new(move |s: RTCIceGathererState| {
            Box::pin(async move {
                debug!("ICE gathering state changed: {}", s);
            })
        }));
    }

    async fn attach_track(
        &self,
        peer_connection: &RTCPeerConnection,
        track: &LocalTrack,
    ) -> Result<(), PeerError> {
        let rtp: Arc<dyn TrackLocal + Send + Sync> = track.rtp();
        let sender = peer_connection.add_track(rtp).await?;

        // Interceptors only run while someone reads RTCP off the sender.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut rtcp_buf = vec![0u8; 1500];
            while rtcp_sender.read(&mut rtcp_buf).await.is_ok() {}
        });

        self.senders.lock().await.push((track.kind(), sender));
        debug!("Attached local {} track {}", track.kind(), track.id());
        Ok(())
    }

    async fn sender_for(&self, kind: TrackKind) -> Option<Arc<RTCRtpSender>> {
        self.senders
            .lock()
            .await
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, sender)| sender.clone())
    }

    async fn replace_ended_video(&self, media: &LocalMedia) -> Result<(), PeerError> {
        let request = CaptureRequest::new(media.stream_id(), true, false);
        let fresh = self
            .media_source
            .capture(&request)
            .await?
            .into_iter()
            .find(|t| t.kind() == TrackKind::Video)
            .ok_or(MediaError::Unavailable)?;

        let sender = self
            .sender_for(TrackKind::Video)
            .await
            .ok_or(PeerError::NotInitialized)?;
        let rtp: Arc<dyn TrackLocal + Send + Sync> = fresh.rtp();
        sender.replace_track(Some(rtp)).await?;

        info!("Replaced ended video track with {}", fresh.id());
        if let Some(old) = media.replace_track(fresh) {
            old.stop();
        }
        Ok(())
    }
}

#[async_trait]
impl PeerSession for PeerConnectionWrapper {
    async fn initialize(&self, events: mpsc::Sender<PeerEvent>) -> Result<(), PeerError> {
        if self.connection.get().is_some() {
            return Err(PeerError::AlreadyInitialized);
        }

        let peer_connection = self.build_connection().await?;
        Self::wire_events(&peer_connection, events);

        if self.connection.set(peer_connection.clone()).is_err() {
            let _ = peer_connection.close().await;
            return Err(PeerError::AlreadyInitialized);
        }

        info!(
            "Peer connection initialized with {} ICE servers",
            self.config.ice_servers.len()
        );
        Ok(())
    }

    async fn acquire_local_media(
        &self,
        want_video: bool,
        want_audio: bool,
    ) -> Result<LocalMedia, PeerError> {
        let peer_connection = self.connection()?;
        if let Some(media) = self.local_media.get() {
            return Ok(media.clone());
        }

        let request = CaptureRequest::new(self.stream_id.clone(), want_video, want_audio);
        let tracks = self.media_source.capture(&request).await?;

        for track in &tracks {
            self.attach_track(peer_connection, track).await?;
        }

        // Still receive what we do not send.
        for kind in [TrackKind::Audio, TrackKind::Video] {
            if tracks.iter().any(|t| t.kind() == kind) {
                continue;
            }
            peer_connection
                .add_transceiver_from_kind(
                    kind.codec_type(),
                    Some(RTCRtpTransceiverInit {
                        direction: RTCRtpTransceiverDirection::Recvonly,
                        send_encodings: Vec::new(),
                    }),
                )
                .await?;
            debug!("Added receive-only {} transceiver", kind);
        }

        let media = LocalMedia::new(request.stream_id, tracks);
        let _ = self.local_media.set(media.clone());
        Ok(media)
    }

    async fn create_offer(&self) -> Result<Option<SessionDescription>, PeerError> {
        let Some(peer_connection) = self.connection.get() else {
            return Ok(None);
        };

        let state = NegotiationState::from(peer_connection.signaling_state());
        if !state.can_create_offer() {
            debug!("Not creating offer in {} state", state);
            return Ok(None);
        }

        let offer = peer_connection.create_offer(None).await?;
        peer_connection.set_local_description(offer.clone()).await?;
        Ok(Some(SessionDescription::offer(offer.sdp)))
    }

    async fn apply_remote_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, PeerError> {
        let peer_connection = self.connection()?;
        if offer.kind != SdpKind::Offer {
            return Err(PeerError::InvalidDescription(
                "expected an offer".to_owned(),
            ));
        }

        let state = NegotiationState::from(peer_connection.signaling_state());
        if !state.can_apply_offer() {
            debug!("Not applying remote offer in {} state", state);
            return Ok(None);
        }

        let remote = RTCSessionDescription::offer(offer.sdp.clone())
            .map_err(|e| PeerError::InvalidDescription(e.to_string()))?;
        peer_connection.set_remote_description(remote).await?;

        let answer = peer_connection.create_answer(None).await?;
        peer_connection.set_local_description(answer.clone()).await?;
        Ok(Some(SessionDescription::answer(answer.sdp)))
    }

    async fn apply_remote_answer(&self, answer: &SessionDescription) -> Result<bool, PeerError> {
        let peer_connection = self.connection()?;
        if answer.kind != SdpKind::Answer {
            return Err(PeerError::InvalidDescription(
                "expected an answer".to_owned(),
            ));
        }

        let state = NegotiationState::from(peer_connection.signaling_state());
        if !state.can_apply_answer() {
            debug!("Not applying remote answer in {} state", state);
            return Ok(false);
        }

        let remote = RTCSessionDescription::answer(answer.sdp.clone())
            .map_err(|e| PeerError::InvalidDescription(e.to_string()))?;
        peer_connection.set_remote_description(remote).await?;
        Ok(true)
    }

    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> bool {
        let Some(peer_connection) = self.connection.get() else {
            return false;
        };
        if peer_connection.remote_description().await.is_none() {
            debug!("Remote description missing, candidate not added");
            return false;
        }

        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: candidate.username_fragment.clone(),
        };

        match peer_connection.add_ice_candidate(init).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to add remote ICE candidate: {}", e);
                false
            }
        }
    }

    async fn has_remote_description(&self) -> bool {
        match self.connection.get() {
            Some(peer_connection) => peer_connection.remote_description().await.is_some(),
            None => false,
        }
    }

    fn negotiation_state(&self) -> NegotiationState {
        self.connection
            .get()
            .map(|pc| NegotiationState::from(pc.signaling_state()))
            .unwrap_or_default()
    }

    async fn rollback_local_offer(&self) -> Result<bool, PeerError> {
        let peer_connection = self.connection()?;
        if NegotiationState::from(peer_connection.signaling_state())
            != NegotiationState::HaveLocalOffer
        {
            return Ok(false);
        }

        // webrtc-rs refuses a local description with an empty body, so the
        // rollback carries the offer it discards.
        let pending = peer_connection
            .pending_local_description()
            .await
            .map(|d| d.sdp)
            .unwrap_or_default();
        let rollback: RTCSessionDescription = serde_json::from_value(serde_json::json!({
            "type": "rollback",
            "sdp": pending,
        }))
        .map_err(|e| PeerError::InvalidDescription(e.to_string()))?;

        peer_connection.set_local_description(rollback).await?;
        info!("Rolled back pending local offer");
        Ok(true)
    }

    async fn set_audio_enabled(&self, enabled: bool) -> bool {
        match self.local_media.get() {
            Some(media) => media.set_enabled(TrackKind::Audio, enabled),
            None => false,
        }
    }

    async fn set_video_enabled(&self, enabled: bool) -> bool {
        let Some(media) = self.local_media.get() else {
            return false;
        };
        if !enabled {
            return media.set_enabled(TrackKind::Video, false);
        }

        let video = media.video_tracks();
        if video.is_empty() {
            return false;
        }
        if let Some(track) = video.iter().find(|t| t.is_live()) {
            track.set_enabled(true);
            return true;
        }

        match self.replace_ended_video(media).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to restore video: {}", e);
                false
            }
        }
    }

    fn local_media(&self) -> Option<LocalMedia> {
        self.local_media.get().cloned()
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(peer_connection) = self.connection.get() {
            if let Err(e) = peer_connection.close().await {
                warn!("Error closing peer connection: {}", e);
            }
        }
        if let Some(media) = self.local_media.get() {
            media.stop_all();
        }
        info!("Peer connection closed");
    }
}

fn map_connection_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    match state {
        RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
        _ => None,
    }
}
