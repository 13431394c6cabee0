use consult_core::relay::{RelayEvent, RelayHub};
use consult_core::{ParticipantId, RoomId, SignalingMessage};
use tokio::sync::mpsc;

/// Passive listener on a room channel. It never tracks presence, so the
/// participants do not see it, but it receives every broadcast.
pub struct RelayTap {
    rx: mpsc::UnboundedReceiver<RelayEvent>,
}

impl RelayTap {
    pub fn attach(hub: &RelayHub, room: &RoomId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.subscribe(&room.channel_name(), ParticipantId::from("relay-tap"), tx)
            .expect("tap subscription");
        Self { rx }
    }

    /// Every signaling message broadcast since the last call.
    pub fn drain(&mut self) -> Vec<SignalingMessage> {
        let mut messages = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            if let RelayEvent::Broadcast(payload) = event {
                messages.push(serde_json::from_str(&payload).expect("signaling payload"));
            }
        }
        messages
    }
}

pub fn offers_from(messages: &[SignalingMessage]) -> Vec<ParticipantId> {
    messages
        .iter()
        .filter(|m| matches!(m, SignalingMessage::Offer { .. }))
        .map(|m| m.sender_id().clone())
        .collect()
}

pub fn count_kind(messages: &[SignalingMessage], kind: &str) -> usize {
    messages.iter().filter(|m| m.kind() == kind).count()
}
