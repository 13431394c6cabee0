use crate::media::RemoteTrack;
use crate::transport::NegotiationState;
use consult_core::{ConnectionState, IceCandidate};

/// Events a peer session reports to the controller.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// The peer started sending a track.
    RemoteTrack(RemoteTrack),

    ConnectionStateChanged(ConnectionState),

    /// A local candidate was discovered and must be relayed to the peer.
    CandidateGenerated(IceCandidate),

    /// The set of local tracks changed in a way that needs a new offer.
    NegotiationNeeded,

    SignalingStateChanged(NegotiationState),
}
