use crate::call::{CallConfig, CallError, CallHandle, CallSnapshot, ControllerCommand, PendingCandidates};
use crate::media::{LocalMedia, MediaSource, RemoteMedia, TrackKind};
use crate::signaling::{Relay, SignalingTransport};
use crate::transport::{
    NegotiationState, PeerConnectionWrapper, PeerEvent, PeerSession, TransportConfig,
};
use consult_core::{ConnectionState, NegotiationRole, ParticipantId, SignalingMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Builds a fresh peer session for each call attempt.
pub type SessionFactory = Arc<dyn Fn() -> Box<dyn PeerSession> + Send + Sync>;

/// Everything that belongs to one call attempt. Dropped as a whole on end,
/// which also cuts off late events from the torn-down attempt.
struct CallAttempt {
    local_id: ParticipantId,
    transport: SignalingTransport,
    session: Arc<dyn PeerSession>,
    signal_rx: mpsc::UnboundedReceiver<SignalingMessage>,
    peer_rx: mpsc::Receiver<PeerEvent>,
    peer: Option<ParticipantId>,
    role: NegotiationRole,
    negotiating: bool,
    pending: PendingCandidates,
    offer_due: Option<Instant>,
}

/// An attempt whose session setup, channel join and capture are still
/// running on `task`. Ending the call aborts it.
struct PendingStart {
    attempt: CallAttempt,
    task: JoinHandle<Result<LocalMedia, CallError>>,
    reply: oneshot::Sender<Result<(), CallError>>,
}

enum Input {
    Command(Option<ControllerCommand>),
    Started(Result<Result<LocalMedia, CallError>, JoinError>),
    Signal(SignalingMessage),
    Peer(PeerEvent),
    OfferDue,
}

/// Drives one two-party call: glare-free offer/answer, candidate queueing,
/// renegotiation and teardown.
///
/// Runs as a single task; every input is handled to completion before the
/// next one is looked at.
pub struct ConnectionController {
    config: CallConfig,
    relay: Arc<dyn Relay>,
    session_factory: SessionFactory,
    command_rx: mpsc::Receiver<ControllerCommand>,
    snapshot_tx: watch::Sender<CallSnapshot>,
    starting: Option<PendingStart>,
    attempt: Option<CallAttempt>,
}

impl ConnectionController {
    pub fn new(
        config: CallConfig,
        relay: Arc<dyn Relay>,
        session_factory: SessionFactory,
    ) -> (Self, CallHandle) {
        let (command_tx, command_rx) = mpsc::channel(100);
        let (snapshot_tx, snapshot_rx) = watch::channel(CallSnapshot::default());

        let controller = Self {
            config,
            relay,
            session_factory,
            command_rx,
            snapshot_tx,
            starting: None,
            attempt: None,
        };

        (controller, CallHandle::new(command_tx, snapshot_rx))
    }

    /// Controller backed by real webrtc peer connections.
    pub fn with_webrtc(
        config: CallConfig,
        relay: Arc<dyn Relay>,
        transport_config: TransportConfig,
        media_source: Arc<dyn MediaSource>,
    ) -> (Self, CallHandle) {
        let factory: SessionFactory = Arc::new(move || {
            Box::new(PeerConnectionWrapper::new(
                transport_config.clone(),
                media_source.clone(),
            )) as Box<dyn PeerSession>
        });
        Self::new(config, relay, factory)
    }

    pub async fn run(mut self) {
        info!("Connection controller started for room {}", self.config.room);

        loop {
            let input = if let Some(start) = self.starting.as_mut() {
                // Signals and peer events stay queued until the start settles.
                tokio::select! {
                    cmd = self.command_rx.recv() => Input::Command(cmd),
                    result = &mut start.task => Input::Started(result),
                }
            } else if let Some(attempt) = self.attempt.as_mut() {
                let offer_due = attempt.offer_due;

                tokio::select! {
                    cmd = self.command_rx.recv() => Input::Command(cmd),
                    Some(msg) = attempt.signal_rx.recv() => Input::Signal(msg),
                    Some(evt) = attempt.peer_rx.recv() => Input::Peer(evt),
                    _ = tokio::time::sleep_until(offer_due.unwrap_or_else(Instant::now)),
                        if offer_due.is_some() => Input::OfferDue,
                }
            } else {
                Input::Command(self.command_rx.recv().await)
            };

            match input {
                Input::Command(Some(cmd)) => self.handle_command(cmd).await,
                Input::Command(None) => {
                    info!("All call handles dropped. Shutting down controller.");
                    break;
                }
                Input::Started(result) => self.finish_start(result).await,
                Input::Signal(msg) => self.handle_signal(msg).await,
                Input::Peer(evt) => self.handle_peer_event(evt).await,
                Input::OfferDue => self.send_grace_offer().await,
            }
        }

        self.end_call().await;
        info!("Connection controller finished");
    }

    async fn handle_command(&mut self, cmd: ControllerCommand) {
        match cmd {
            ControllerCommand::StartCall { reply } => self.start_call(reply),
            ControllerCommand::EndCall { reply } => {
                self.end_call().await;
                let _ = reply.send(());
            }
            ControllerCommand::ToggleAudio { reply } => {
                let enabled = self.toggle_audio().await;
                let _ = reply.send(enabled);
            }
            ControllerCommand::ToggleVideo { reply } => {
                let enabled = self.toggle_video().await;
                let _ = reply.send(enabled);
            }
        }
    }

    /// Kicks off a new attempt. The reply is sent once setup settles, or
    /// right away when the call is already active or cannot start.
    fn start_call(&mut self, reply: oneshot::Sender<Result<(), CallError>>) {
        if self.attempt.is_some() || self.starting.is_some() {
            info!("Call already active, ignoring start");
            let _ = reply.send(Ok(()));
            return;
        }

        if self.config.room.is_empty() {
            let err = CallError::Failed("room id is empty".to_owned());
            self.publish_failure(&err);
            let _ = reply.send(Err(err));
            return;
        }

        let local_id = self
            .config
            .participant
            .clone()
            .unwrap_or_else(ParticipantId::generate);
        info!("Starting call in room {} as {}", self.config.room, local_id);

        self.snapshot_tx.send_modify(|s| {
            s.connection_state = ConnectionState::Connecting;
            s.call_active = true;
            s.last_error = None;
        });

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (peer_tx, peer_rx) = mpsc::channel(256);
        let transport = SignalingTransport::new(
            self.relay.clone(),
            self.config.room.clone(),
            local_id.clone(),
            signal_tx,
        );
        let session: Arc<dyn PeerSession> = Arc::from((self.session_factory)());

        let task = tokio::spawn(prepare(
            transport.clone(),
            session.clone(),
            peer_tx,
            self.config.connect_timeout,
            self.config.with_video,
            self.config.with_audio,
        ));

        self.starting = Some(PendingStart {
            attempt: CallAttempt {
                local_id,
                transport,
                session,
                signal_rx,
                peer_rx,
                peer: None,
                role: NegotiationRole::default(),
                negotiating: false,
                pending: PendingCandidates::default(),
                offer_due: None,
            },
            task,
            reply,
        });
    }

    async fn finish_start(&mut self, result: Result<Result<LocalMedia, CallError>, JoinError>) {
        let Some(PendingStart { attempt, reply, .. }) = self.starting.take() else {
            return;
        };

        let local_media = match result {
            Ok(Ok(media)) => media,
            Ok(Err(err)) => {
                self.abandon_start(attempt, reply, err).await;
                return;
            }
            Err(e) => {
                let err = CallError::Failed(format!("call setup task failed: {e}"));
                self.abandon_start(attempt, reply, err).await;
                return;
            }
        };

        let (audio_enabled, video_enabled) = {
            let snapshot = self.snapshot_tx.borrow();
            (snapshot.audio_enabled, snapshot.video_enabled)
        };
        if !audio_enabled {
            attempt.session.set_audio_enabled(false).await;
        }
        if !video_enabled {
            attempt.session.set_video_enabled(false).await;
        }

        self.snapshot_tx
            .send_modify(|s| s.local_media = Some(local_media));

        attempt
            .transport
            .send(SignalingMessage::Join {
                sender_id: attempt.local_id.clone(),
            })
            .await;

        self.attempt = Some(attempt);
        let _ = reply.send(Ok(()));
    }

    async fn abandon_start(
        &mut self,
        attempt: CallAttempt,
        reply: oneshot::Sender<Result<(), CallError>>,
        err: CallError,
    ) {
        error!("Call start failed: {}", err);
        attempt.transport.disconnect().await;
        attempt.session.close().await;
        self.publish_failure(&err);
        let _ = reply.send(Err(err));
    }

    fn publish_failure(&self, err: &CallError) {
        self.snapshot_tx.send_modify(|s| {
            reset_keeping_preferences(s);
            s.connection_state = ConnectionState::Failed;
            s.last_error = Some(err.clone());
        });
    }

    async fn end_call(&mut self) {
        if let Some(start) = self.starting.take() {
            info!("Cancelling call start in room {}", self.config.room);
            start.task.abort();
            start.attempt.transport.disconnect().await;
            start.attempt.session.close().await;
            let _ = start.reply.send(Err(CallError::Failed(
                "call ended before it was established".to_owned(),
            )));
            self.snapshot_tx.send_modify(reset_keeping_preferences);
            return;
        }

        let Some(attempt) = self.attempt.take() else {
            self.snapshot_tx.send_if_modified(|s| {
                if s.connection_state == ConnectionState::Idle && !s.call_active {
                    return false;
                }
                reset_keeping_preferences(s);
                true
            });
            return;
        };

        info!("Ending call in room {}", self.config.room);
        attempt
            .transport
            .send(SignalingMessage::Leave {
                sender_id: attempt.local_id.clone(),
            })
            .await;
        attempt.transport.disconnect().await;
        attempt.session.close().await;

        self.snapshot_tx.send_modify(reset_keeping_preferences);
    }

    async fn toggle_audio(&mut self) -> bool {
        let enabled = !self.snapshot_tx.borrow().audio_enabled;

        if let Some(attempt) = &self.attempt {
            attempt.session.set_audio_enabled(enabled).await;
        }

        self.snapshot_tx.send_modify(|s| s.audio_enabled = enabled);
        info!("Microphone {}", if enabled { "on" } else { "off" });
        enabled
    }

    async fn toggle_video(&mut self) -> bool {
        let enabled = !self.snapshot_tx.borrow().video_enabled;

        if let Some(attempt) = &self.attempt {
            let applied = attempt.session.set_video_enabled(enabled).await;
            let has_video = attempt
                .session
                .local_media()
                .is_some_and(|m| m.has(TrackKind::Video));

            if enabled && has_video && !applied {
                warn!("Camera could not be re-enabled");
                return false;
            }
        }

        self.snapshot_tx.send_modify(|s| s.video_enabled = enabled);
        info!("Camera {}", if enabled { "on" } else { "off" });
        enabled
    }

    async fn handle_signal(&mut self, msg: SignalingMessage) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };

        match msg {
            SignalingMessage::Join { sender_id } => {
                if attempt.peer.as_ref() == Some(&sender_id) {
                    debug!("Duplicate join from {}", sender_id);
                    return;
                }

                let role = NegotiationRole::resolve(&attempt.local_id, &sender_id);
                info!("Participant {} joined, local role is {:?}", sender_id, role);

                attempt.peer = Some(sender_id);
                attempt.role = role;
                if role.is_offerer() {
                    attempt.offer_due = Some(Instant::now() + self.config.offer_grace);
                }
                self.snapshot_tx.send_modify(|s| s.peer_present = true);
            }

            SignalingMessage::Offer { sender_id, data } => {
                info!("Received offer from {}", sender_id);

                attempt.peer = Some(sender_id.clone());
                attempt.role = NegotiationRole::Answerer;
                attempt.offer_due = None;
                self.snapshot_tx.send_modify(|s| s.peer_present = true);

                if attempt.session.negotiation_state() == NegotiationState::HaveLocalOffer {
                    match attempt.session.rollback_local_offer().await {
                        Ok(_) => attempt.negotiating = false,
                        Err(e) => warn!("Failed to roll back local offer: {}", e),
                    }
                }

                match attempt.session.apply_remote_offer(&data).await {
                    Ok(Some(answer)) => {
                        attempt
                            .transport
                            .send(SignalingMessage::Answer {
                                sender_id: attempt.local_id.clone(),
                                data: answer,
                            })
                            .await;
                        Self::drain_pending(attempt).await;
                    }
                    Ok(None) => warn!(
                        "Offer from {} ignored in {} state",
                        sender_id,
                        attempt.session.negotiation_state()
                    ),
                    Err(e) => error!("Failed to apply offer from {}: {}", sender_id, e),
                }
            }

            SignalingMessage::Answer { sender_id, data } => {
                info!("Received answer from {}", sender_id);

                match attempt.session.apply_remote_answer(&data).await {
                    Ok(true) => {
                        attempt.negotiating = false;
                        Self::drain_pending(attempt).await;
                    }
                    Ok(false) => debug!("Answer from {} ignored, no offer pending", sender_id),
                    Err(e) => error!("Failed to apply answer from {}: {}", sender_id, e),
                }
            }

            SignalingMessage::IceCandidate { data, .. } => {
                if !attempt.session.has_remote_description().await {
                    attempt.pending.push(data);
                    debug!(
                        "Queued candidate until remote description is set ({} pending)",
                        attempt.pending.len()
                    );
                    return;
                }

                if !attempt.session.add_remote_candidate(&data).await {
                    debug!("Candidate rejected, queued for the next drain");
                    attempt.pending.push(data);
                }
            }

            SignalingMessage::Leave { sender_id } => {
                if attempt.peer.as_ref() != Some(&sender_id) {
                    debug!("Ignoring leave from unknown participant {}", sender_id);
                    return;
                }

                info!("Participant {} left the call", sender_id);
                attempt.peer = None;
                attempt.role = NegotiationRole::default();
                attempt.negotiating = false;
                attempt.offer_due = None;
                attempt.pending.clear();

                self.snapshot_tx.send_modify(|s| {
                    s.remote_media = None;
                    s.peer_present = false;
                    s.connection_state = ConnectionState::Disconnected;
                });
            }
        }
    }

    async fn handle_peer_event(&mut self, event: PeerEvent) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };

        match event {
            PeerEvent::RemoteTrack(track) => {
                self.snapshot_tx.send_modify(|s| {
                    s.remote_media = Some(match s.remote_media.take() {
                        Some(media) => media.with_track(track),
                        None => RemoteMedia::from_track(track),
                    });
                });
            }

            PeerEvent::ConnectionStateChanged(state) => {
                info!("Connection state: {}", state);
                self.snapshot_tx
                    .send_modify(|s| s.connection_state = state);
            }

            PeerEvent::CandidateGenerated(candidate) => {
                attempt
                    .transport
                    .send(SignalingMessage::IceCandidate {
                        sender_id: attempt.local_id.clone(),
                        data: candidate,
                    })
                    .await;
            }

            PeerEvent::NegotiationNeeded => {
                let Some(peer) = attempt.peer.clone() else {
                    debug!("Negotiation needed before any peer joined, ignoring");
                    return;
                };
                if attempt.negotiating || attempt.offer_due.is_some() {
                    debug!("Negotiation already in flight, ignoring");
                    return;
                }
                if !attempt.role.is_offerer() {
                    debug!("Negotiation needed, leaving it to {}", peer);
                    return;
                }

                info!("Renegotiating with {}", peer);
                Self::send_offer(attempt).await;
            }

            PeerEvent::SignalingStateChanged(state) => {
                if state == NegotiationState::Stable {
                    attempt.negotiating = false;
                }
            }
        }
    }

    async fn send_grace_offer(&mut self) {
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };

        attempt.offer_due = None;
        if attempt.peer.is_none() || !attempt.role.is_offerer() {
            return;
        }
        Self::send_offer(attempt).await;
    }

    async fn send_offer(attempt: &mut CallAttempt) {
        attempt.negotiating = true;

        match attempt.session.create_offer().await {
            Ok(Some(offer)) => {
                info!("Sending offer");
                attempt
                    .transport
                    .send(SignalingMessage::Offer {
                        sender_id: attempt.local_id.clone(),
                        data: offer,
                    })
                    .await;
            }
            Ok(None) => {
                let state = attempt.session.negotiation_state();
                debug!("Offer not created in {} state", state);
                if state == NegotiationState::Stable {
                    attempt.negotiating = false;
                }
            }
            Err(e) => {
                attempt.negotiating = false;
                warn!("Failed to start negotiation: {}", e);
            }
        }
    }

    async fn drain_pending(attempt: &mut CallAttempt) {
        let queued = attempt.pending.take_all();
        if queued.is_empty() {
            return;
        }

        debug!("Draining {} queued candidates", queued.len());
        for candidate in queued {
            if !attempt.session.add_remote_candidate(&candidate).await {
                attempt.pending.push(candidate);
            }
        }
    }
}

/// Initializes the session, joins the signaling channel and captures local
/// media. Runs on its own task so ending the call can abort it.
async fn prepare(
    transport: SignalingTransport,
    session: Arc<dyn PeerSession>,
    peer_tx: mpsc::Sender<PeerEvent>,
    connect_timeout: Duration,
    with_video: bool,
    with_audio: bool,
) -> Result<LocalMedia, CallError> {
    session.initialize(peer_tx).await?;

    match tokio::time::timeout(connect_timeout, transport.connect()).await {
        Ok(connected) => connected?,
        Err(_) => {
            return Err(CallError::TransportUnavailable(
                "timed out joining signaling channel".to_owned(),
            ));
        }
    }

    let media = session.acquire_local_media(with_video, with_audio).await?;
    Ok(media)
}

/// Back to idle. Microphone and camera preferences carry over to the next
/// attempt.
fn reset_keeping_preferences(snapshot: &mut CallSnapshot) {
    *snapshot = CallSnapshot {
        audio_enabled: snapshot.audio_enabled,
        video_enabled: snapshot.video_enabled,
        ..CallSnapshot::default()
    };
}
