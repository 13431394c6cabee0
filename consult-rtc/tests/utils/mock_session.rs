use async_trait::async_trait;
use consult_core::{ConnectionState, IceCandidate, SessionDescription};
use consult_rtc::{
    CaptureRequest, LocalMedia, MediaError, MediaSource, NegotiationState, PeerError, PeerEvent,
    PeerSession, RemoteTrack, SessionFactory, SyntheticMediaSource, TrackKind,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Operations a mock session was asked to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Initialize,
    AcquireMedia,
    CreateOffer,
    ApplyOffer(String),
    ApplyAnswer(String),
    AddCandidate(String),
    Rollback,
    ReplaceVideo,
    Close,
}

/// Shared record of every session a factory produced.
#[derive(Default)]
pub struct SessionProbe {
    calls: Mutex<Vec<SessionCall>>,
    sessions: AtomicUsize,
    reject_candidates: AtomicUsize,
    events: Mutex<Option<mpsc::Sender<PeerEvent>>>,
}

impl SessionProbe {
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &SessionCall) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn offers_created(&self) -> usize {
        self.count(&SessionCall::CreateOffer)
    }

    pub fn candidates(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SessionCall::AddCandidate(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    /// Makes the next `n` candidate additions fail.
    pub fn reject_next_candidates(&self, n: usize) {
        self.reject_candidates.store(n, Ordering::SeqCst);
    }

    /// Injects an event as if the latest session had raised it.
    pub async fn emit(&self, event: PeerEvent) {
        let tx = self.events.lock().unwrap().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

struct MockState {
    negotiation: NegotiationState,
    remote_description: bool,
    local_media: Option<LocalMedia>,
    closed: bool,
    offers: usize,
}

/// Scripted [`PeerSession`]: descriptions are opaque strings and applying
/// one side of the exchange immediately reports the connection as up.
pub struct MockPeerSession {
    probe: Arc<SessionProbe>,
    media: SyntheticMediaSource,
    state: Mutex<MockState>,
}

impl MockPeerSession {
    pub fn new(probe: Arc<SessionProbe>, media: SyntheticMediaSource) -> Self {
        probe.sessions.fetch_add(1, Ordering::SeqCst);
        Self {
            probe,
            media,
            state: Mutex::new(MockState {
                negotiation: NegotiationState::Stable,
                remote_description: false,
                local_media: None,
                closed: false,
                offers: 0,
            }),
        }
    }

    pub fn factory(probe: Arc<SessionProbe>, media: SyntheticMediaSource) -> SessionFactory {
        Arc::new(move || {
            Box::new(MockPeerSession::new(probe.clone(), media.clone())) as Box<dyn PeerSession>
        })
    }

    async fn emit(&self, event: PeerEvent) {
        self.probe.emit(event).await;
    }

    async fn report_connected(&self) {
        self.emit(PeerEvent::SignalingStateChanged(NegotiationState::Stable))
            .await;
        self.emit(PeerEvent::ConnectionStateChanged(ConnectionState::Connected))
            .await;
        self.emit(PeerEvent::RemoteTrack(RemoteTrack::new(
            "remote-audio",
            TrackKind::Audio,
            "remote-stream",
        )))
        .await;
    }
}

#[async_trait]
impl PeerSession for MockPeerSession {
    async fn initialize(&self, events: mpsc::Sender<PeerEvent>) -> Result<(), PeerError> {
        self.probe.record(SessionCall::Initialize);
        *self.probe.events.lock().unwrap() = Some(events);
        Ok(())
    }

    async fn acquire_local_media(
        &self,
        want_video: bool,
        want_audio: bool,
    ) -> Result<LocalMedia, PeerError> {
        self.probe.record(SessionCall::AcquireMedia);

        let request = CaptureRequest::new("mock-stream", want_video, want_audio);
        let tracks = self.media.capture(&request).await?;
        let media = LocalMedia::new(request.stream_id, tracks);
        self.state.lock().unwrap().local_media = Some(media.clone());

        self.emit(PeerEvent::NegotiationNeeded).await;
        Ok(media)
    }

    async fn create_offer(&self) -> Result<Option<SessionDescription>, PeerError> {
        let sdp = {
            let mut state = self.state.lock().unwrap();
            if state.negotiation != NegotiationState::Stable {
                return Ok(None);
            }
            state.negotiation = NegotiationState::HaveLocalOffer;
            state.offers += 1;
            format!("mock-offer-{}", state.offers)
        };
        self.probe.record(SessionCall::CreateOffer);
        self.emit(PeerEvent::SignalingStateChanged(
            NegotiationState::HaveLocalOffer,
        ))
        .await;
        Ok(Some(SessionDescription::offer(sdp)))
    }

    async fn apply_remote_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, PeerError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.negotiation != NegotiationState::Stable {
                return Ok(None);
            }
            state.remote_description = true;
        }
        self.probe.record(SessionCall::ApplyOffer(offer.sdp.clone()));
        self.report_connected().await;
        Ok(Some(SessionDescription::answer(format!(
            "answer-to-{}",
            offer.sdp
        ))))
    }

    async fn apply_remote_answer(&self, answer: &SessionDescription) -> Result<bool, PeerError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.negotiation != NegotiationState::HaveLocalOffer {
                return Ok(false);
            }
            state.negotiation = NegotiationState::Stable;
            state.remote_description = true;
        }
        self.probe
            .record(SessionCall::ApplyAnswer(answer.sdp.clone()));
        self.report_connected().await;
        Ok(true)
    }

    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> bool {
        if !self.state.lock().unwrap().remote_description {
            return false;
        }
        let rejected = self
            .probe
            .reject_candidates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rejected {
            return false;
        }
        self.probe
            .record(SessionCall::AddCandidate(candidate.candidate.clone()));
        true
    }

    async fn has_remote_description(&self) -> bool {
        self.state.lock().unwrap().remote_description
    }

    fn negotiation_state(&self) -> NegotiationState {
        self.state.lock().unwrap().negotiation
    }

    async fn rollback_local_offer(&self) -> Result<bool, PeerError> {
        {
            let mut state = self.state.lock().unwrap();
            if state.negotiation != NegotiationState::HaveLocalOffer {
                return Ok(false);
            }
            state.negotiation = NegotiationState::Stable;
        }
        self.probe.record(SessionCall::Rollback);
        Ok(true)
    }

    async fn set_audio_enabled(&self, enabled: bool) -> bool {
        match self.local_media() {
            Some(media) => media.set_enabled(TrackKind::Audio, enabled),
            None => false,
        }
    }

    async fn set_video_enabled(&self, enabled: bool) -> bool {
        let Some(media) = self.local_media() else {
            return false;
        };
        if !enabled {
            return media.set_enabled(TrackKind::Video, false);
        }
        if let Some(live) = media.video_tracks().into_iter().find(|t| t.is_live()) {
            live.set_enabled(true);
            return true;
        }

        let request = CaptureRequest::new(media.stream_id(), true, false);
        let Ok(mut fresh) = self.media.capture(&request).await else {
            return false;
        };
        let Some(track) = fresh.pop() else {
            return false;
        };
        media.replace_track(track);
        self.probe.record(SessionCall::ReplaceVideo);
        true
    }

    fn local_media(&self) -> Option<LocalMedia> {
        self.state.lock().unwrap().local_media.clone()
    }

    async fn close(&self) {
        let media = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
            state.negotiation = NegotiationState::Closed;
            state.local_media.clone()
        };
        self.probe.record(SessionCall::Close);
        if let Some(media) = media {
            media.stop_all();
        }
    }
}

/// Surfaces a capture failure the way a device layer would.
pub fn media_failure(error: MediaError) -> SyntheticMediaSource {
    match error {
        MediaError::PermissionDenied => SyntheticMediaSource::default().denying_permission(),
        MediaError::Unavailable => SyntheticMediaSource::default()
            .without_camera()
            .without_microphone(),
    }
}
