use consult_core::{ParticipantId, RoomId};
use std::time::Duration;

pub const DEFAULT_OFFER_GRACE: Duration = Duration::from_millis(300);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CallConfig {
    pub room: RoomId,
    pub with_video: bool,
    pub with_audio: bool,
    /// Fixed identity for every attempt. A fresh one is generated per
    /// attempt when unset.
    pub participant: Option<ParticipantId>,
    /// Delay before the offerer sends its first offer, so the peer can
    /// finish its own setup.
    pub offer_grace: Duration,
    pub connect_timeout: Duration,
}

impl CallConfig {
    pub fn new(room: RoomId) -> Self {
        Self {
            room,
            with_video: true,
            with_audio: true,
            participant: None,
            offer_grace: DEFAULT_OFFER_GRACE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn for_appointment(appointment_id: impl std::fmt::Display) -> Self {
        Self::new(RoomId::for_appointment(appointment_id))
    }

    pub fn with_participant(mut self, participant: impl Into<ParticipantId>) -> Self {
        self.participant = Some(participant.into());
        self
    }

    pub fn without_video(mut self) -> Self {
        self.with_video = false;
        self
    }

    pub fn without_audio(mut self) -> Self {
        self.with_audio = false;
        self
    }

    pub fn with_offer_grace(mut self, offer_grace: Duration) -> Self {
        self.offer_grace = offer_grace;
        self
    }
}
