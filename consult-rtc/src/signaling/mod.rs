mod memory_relay;
mod relay;
mod signaling_transport;
mod ws_relay;

pub use memory_relay::*;
pub use relay::*;
pub use signaling_transport::*;
pub use ws_relay::*;
