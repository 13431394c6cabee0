use crate::model::ParticipantId;

/// Which side drives the offer/answer exchange.
///
/// Never stored on the wire: both sides derive it from the pair of
/// identities, so they agree without coordinating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationRole {
    Offerer,
    #[default]
    Answerer,
}

impl NegotiationRole {
    /// The identity that compares greater offers. Equal identities make
    /// both sides answerers; nobody offers and the call stays pending.
    pub fn resolve(local: &ParticipantId, remote: &ParticipantId) -> Self {
        if local > remote {
            Self::Offerer
        } else {
            Self::Answerer
        }
    }

    pub fn is_offerer(self) -> bool {
        self == Self::Offerer
    }
}
