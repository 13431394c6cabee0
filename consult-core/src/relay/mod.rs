mod frame;
mod hub;

pub use frame::{ClientFrame, ServerFrame};
pub use hub::{HubError, RelayEvent, RelayHub};
