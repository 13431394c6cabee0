use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque room token shared by both sides of a consultation.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Room naming convention used by the scheduling side.
    pub fn for_appointment(appointment_id: impl fmt::Display) -> Self {
        Self(format!("consultation-{appointment_id}"))
    }

    /// Relay channel that carries this room's signaling.
    pub fn channel_name(&self) -> String {
        format!("video-call:{}", self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
