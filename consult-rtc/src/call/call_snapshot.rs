use crate::call::CallError;
use crate::media::{LocalMedia, RemoteMedia};
use consult_core::ConnectionState;

/// Everything the presentation layer observes about a call.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub local_media: Option<LocalMedia>,
    pub remote_media: Option<RemoteMedia>,
    pub connection_state: ConnectionState,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub last_error: Option<CallError>,
    pub peer_present: bool,
    pub call_active: bool,
}

impl Default for CallSnapshot {
    fn default() -> Self {
        Self {
            local_media: None,
            remote_media: None,
            connection_state: ConnectionState::Idle,
            audio_enabled: true,
            video_enabled: true,
            last_error: None,
            peer_present: false,
            call_active: false,
        }
    }
}
