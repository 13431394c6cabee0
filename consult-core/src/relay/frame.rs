use crate::model::ParticipantId;
use crate::relay::RelayEvent;
use serde::{Deserialize, Serialize};

/// Frames a relay client sends over its WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientFrame {
    Track,
    Untrack,
    Broadcast { payload: String },
}

/// Frames the relay server pushes to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ServerFrame {
    Subscribed,
    Rejected { reason: String },
    Broadcast { payload: String },
    PresenceJoin { key: ParticipantId },
    PresenceLeave { key: ParticipantId },
}

impl ServerFrame {
    /// Channel traffic carried by this frame; handshake frames yield `None`.
    pub fn into_event(self) -> Option<RelayEvent> {
        match self {
            Self::Broadcast { payload } => Some(RelayEvent::Broadcast(payload)),
            Self::PresenceJoin { key } => Some(RelayEvent::PresenceJoin(key)),
            Self::PresenceLeave { key } => Some(RelayEvent::PresenceLeave(key)),
            Self::Subscribed | Self::Rejected { .. } => None,
        }
    }
}

impl From<RelayEvent> for ServerFrame {
    fn from(event: RelayEvent) -> Self {
        match event {
            RelayEvent::Broadcast(payload) => Self::Broadcast { payload },
            RelayEvent::PresenceJoin(key) => Self::PresenceJoin { key },
            RelayEvent::PresenceLeave(key) => Self::PresenceLeave { key },
        }
    }
}
