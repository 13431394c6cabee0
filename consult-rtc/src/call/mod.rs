mod call_config;
mod call_error;
mod call_handle;
mod call_snapshot;
mod connection_controller;
mod controller_command;
mod pending_candidates;

pub use call_config::*;
pub use call_error::*;
pub use call_handle::*;
pub use call_snapshot::*;
pub use connection_controller::*;
pub use controller_command::*;
pub use pending_candidates::*;
