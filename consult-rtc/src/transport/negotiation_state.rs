use std::fmt;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

/// Offer/answer state of a native connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NegotiationState {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
    Closed,
}

/// A mutation the offer/answer machine may be asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationOp {
    SetLocalOffer,
    SetRemoteOffer,
    SetLocalAnswer,
    SetRemoteAnswer,
    Rollback,
    Close,
}

impl NegotiationState {
    /// The state after `op`, or `None` when `op` is not allowed here.
    pub fn transition(self, op: NegotiationOp) -> Option<NegotiationState> {
        use NegotiationOp::*;
        use NegotiationState::*;

        match (self, op) {
            (Stable, SetLocalOffer) => Some(HaveLocalOffer),
            (Stable, SetRemoteOffer) => Some(HaveRemoteOffer),
            (HaveRemoteOffer, SetLocalAnswer) => Some(Stable),
            (HaveLocalOffer, SetRemoteAnswer) => Some(Stable),
            (HaveLocalOffer | HaveRemoteOffer, Rollback) => Some(Stable),
            (Closed, _) => None,
            (_, Close) => Some(Closed),
            _ => None,
        }
    }

    pub fn can_create_offer(self) -> bool {
        self.transition(NegotiationOp::SetLocalOffer).is_some()
    }

    pub fn can_apply_offer(self) -> bool {
        self.transition(NegotiationOp::SetRemoteOffer).is_some()
    }

    pub fn can_apply_answer(self) -> bool {
        self.transition(NegotiationOp::SetRemoteAnswer).is_some()
    }
}

impl From<RTCSignalingState> for NegotiationState {
    fn from(state: RTCSignalingState) -> Self {
        match state {
            RTCSignalingState::HaveLocalOffer | RTCSignalingState::HaveRemotePranswer => {
                NegotiationState::HaveLocalOffer
            }
            RTCSignalingState::HaveRemoteOffer | RTCSignalingState::HaveLocalPranswer => {
                NegotiationState::HaveRemoteOffer
            }
            RTCSignalingState::Closed => NegotiationState::Closed,
            _ => NegotiationState::Stable,
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Stable => "stable",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Closed => "closed",
        };
        f.write_str(name)
    }
}
