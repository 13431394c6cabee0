use crate::signaling::{Relay, RelayChannel};
use consult_core::relay::RelayEvent;
use consult_core::{ParticipantId, RoomId, SignalingMessage};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("signaling transport unavailable: {0}")]
    Unavailable(String),

    #[error("signaling transport was disconnected")]
    Closed,
}

enum Link {
    Idle,
    Connecting,
    Ready(Box<dyn RelayChannel>),
    Closed,
}

struct TransportState {
    link: Link,
    pending: Vec<SignalingMessage>,
    forwarder: Option<JoinHandle<()>>,
}

struct TransportInner {
    room: RoomId,
    participant: ParticipantId,
    relay: Arc<dyn Relay>,
    handler: mpsc::UnboundedSender<SignalingMessage>,
    state: Mutex<TransportState>,
}

/// Room-scoped signaling over a best-effort relay.
///
/// Knows nothing about the negotiation protocol: it moves
/// [`SignalingMessage`]s in and out, hides this participant's own echoes and
/// turns presence changes into `join`/`leave` messages. Sends issued before
/// the channel is ready are held back and flushed in submission order.
#[derive(Clone)]
pub struct SignalingTransport {
    inner: Arc<TransportInner>,
}

impl SignalingTransport {
    pub fn new(
        relay: Arc<dyn Relay>,
        room: RoomId,
        participant: ParticipantId,
        handler: mpsc::UnboundedSender<SignalingMessage>,
    ) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                room,
                participant,
                relay,
                handler,
                state: Mutex::new(TransportState {
                    link: Link::Idle,
                    pending: Vec::new(),
                    forwarder: None,
                }),
            }),
        }
    }

    pub fn participant(&self) -> &ParticipantId {
        &self.inner.participant
    }

    pub fn room(&self) -> &RoomId {
        &self.inner.room
    }

    pub async fn connect(&self) -> Result<(), TransportError> {
        {
            let mut state = self.inner.state.lock().await;
            match state.link {
                Link::Ready(_) => return Ok(()),
                Link::Connecting => {
                    return Err(TransportError::Unavailable(
                        "connect already in progress".into(),
                    ));
                }
                Link::Closed => return Err(TransportError::Closed),
                Link::Idle => state.link = Link::Connecting,
            }
        }

        let channel_name = self.inner.room.channel_name();
        let participant = self.inner.participant.clone();
        info!(
            "Connecting to signaling channel {} as {}",
            channel_name, participant
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let channel = match self
            .inner
            .relay
            .subscribe(&channel_name, &participant, events_tx)
            .await
        {
            Ok(channel) => channel,
            Err(e) => {
                error!("Failed to join signaling channel {}: {}", channel_name, e);
                self.abandon_connect().await;
                return Err(TransportError::Unavailable(e.to_string()));
            }
        };

        if let Err(e) = channel.track().await {
            error!("Failed to track presence in {}: {}", channel_name, e);
            channel.close().await;
            self.abandon_connect().await;
            return Err(TransportError::Unavailable(e.to_string()));
        }

        let forwarder = tokio::spawn(forward_events(
            participant,
            events_rx,
            self.inner.handler.clone(),
        ));

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        if matches!(state.link, Link::Closed) {
            debug!("Transport disconnected while connecting, releasing channel");
            forwarder.abort();
            channel.untrack().await;
            channel.close().await;
            return Err(TransportError::Closed);
        }

        let pending = std::mem::take(&mut state.pending);
        if !pending.is_empty() {
            debug!("Flushing {} queued signaling messages", pending.len());
        }
        for msg in &pending {
            publish(channel.as_ref(), msg).await;
        }

        state.link = Link::Ready(channel);
        state.forwarder = Some(forwarder);
        info!("Signaling channel {} ready", channel_name);
        Ok(())
    }

    /// Best-effort send. Relay errors are logged, never returned.
    pub async fn send(&self, msg: SignalingMessage) {
        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;

        match &state.link {
            Link::Ready(channel) => publish(channel.as_ref(), &msg).await,
            Link::Idle | Link::Connecting => {
                debug!("Queuing {} signal until channel is ready", msg.kind());
                state.pending.push(msg);
            }
            Link::Closed => debug!("Dropping {} signal, transport disconnected", msg.kind()),
        }
    }

    pub async fn disconnect(&self) {
        let mut state = self.inner.state.lock().await;
        let link = std::mem::replace(&mut state.link, Link::Closed);
        state.pending.clear();
        if let Some(forwarder) = state.forwarder.take() {
            forwarder.abort();
        }
        drop(state);

        if let Link::Ready(channel) = link {
            channel.untrack().await;
            channel.close().await;
            info!("Disconnected from signaling channel {}", self.inner.room);
        }
    }

    async fn abandon_connect(&self) {
        let mut state = self.inner.state.lock().await;
        if matches!(state.link, Link::Connecting) {
            state.link = Link::Idle;
        }
    }
}

async fn publish(channel: &dyn RelayChannel, msg: &SignalingMessage) {
    let payload = match serde_json::to_string(msg) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to serialize signaling message: {}", e);
            return;
        }
    };

    match channel.broadcast(payload).await {
        Ok(()) => debug!("Sent {} signal", msg.kind()),
        Err(e) => error!("Failed to send {} signal: {}", msg.kind(), e),
    }
}

async fn forward_events(
    local: ParticipantId,
    mut events: mpsc::UnboundedReceiver<RelayEvent>,
    handler: mpsc::UnboundedSender<SignalingMessage>,
) {
    while let Some(event) = events.recv().await {
        let Some(msg) = normalize_relay_event(&local, event) else {
            continue;
        };

        debug!("Received {} from {}", msg.kind(), msg.sender_id());
        if handler.send(msg).is_err() {
            debug!("Signal handler dropped, stopping relay forwarding");
            break;
        }
    }
}

/// Maps one relay event onto the signaling vocabulary.
///
/// Returns `None` for this participant's own traffic and for payloads that
/// do not parse.
pub fn normalize_relay_event(
    local: &ParticipantId,
    event: RelayEvent,
) -> Option<SignalingMessage> {
    match event {
        RelayEvent::Broadcast(payload) => {
            match serde_json::from_str::<SignalingMessage>(&payload) {
                Ok(msg) if msg.sender_id() == local => {
                    trace!("Suppressing own {} signal", msg.kind());
                    None
                }
                Ok(msg) => Some(msg),
                Err(e) => {
                    warn!("Dropping malformed signaling payload: {}", e);
                    None
                }
            }
        }
        RelayEvent::PresenceJoin(key) if &key != local => {
            Some(SignalingMessage::Join { sender_id: key })
        }
        RelayEvent::PresenceLeave(key) if &key != local => {
            Some(SignalingMessage::Leave { sender_id: key })
        }
        RelayEvent::PresenceJoin(_) | RelayEvent::PresenceLeave(_) => None,
    }
}
