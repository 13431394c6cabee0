use crate::media::MediaError;
use crate::signaling::TransportError;
use crate::transport::PeerError;

/// Why a call could not be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("signaling unavailable: {0}")]
    TransportUnavailable(String),

    #[error("camera or microphone access was denied")]
    MediaAcquisitionDenied,

    #[error("no camera or microphone available")]
    MediaUnavailable,

    #[error("call failed: {0}")]
    Failed(String),
}

impl From<TransportError> for CallError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Unavailable(reason) => CallError::TransportUnavailable(reason),
            TransportError::Closed => CallError::TransportUnavailable(e.to_string()),
        }
    }
}

impl From<MediaError> for CallError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::PermissionDenied => CallError::MediaAcquisitionDenied,
            MediaError::Unavailable => CallError::MediaUnavailable,
        }
    }
}

impl From<PeerError> for CallError {
    fn from(e: PeerError) -> Self {
        match e {
            PeerError::Media(media) => media.into(),
            other => CallError::Failed(other.to_string()),
        }
    }
}
