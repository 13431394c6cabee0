mod negotiation_state;
mod peer_connection_wrapper;
mod peer_event;
mod peer_session;
mod transport_config;

pub use negotiation_state::*;
pub use peer_connection_wrapper::*;
pub use peer_event::*;
pub use peer_session::*;
pub use transport_config::*;
