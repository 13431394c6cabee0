pub mod model;
pub mod relay;
pub mod utils;

pub use model::{
    ConnectionState, IceCandidate, IceServerConfig, NegotiationRole, ParticipantId, RoomId,
    SdpKind, SessionDescription, SignalingMessage,
};
