pub use consult_core::{ParticipantId, RoomId};

pub mod model {
    pub use consult_core::*;
}

pub mod rtc {
    pub use consult_rtc::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use consult_relay::*;
}
