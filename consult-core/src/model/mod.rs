mod participant;
mod role;
mod room;
mod signaling;
mod state;

pub use participant::ParticipantId;
pub use role::NegotiationRole;
pub use room::RoomId;
pub use signaling::{IceCandidate, IceServerConfig, SdpKind, SessionDescription, SignalingMessage};
pub use state::ConnectionState;
