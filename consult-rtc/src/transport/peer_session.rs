use crate::media::{LocalMedia, MediaError};
use crate::transport::{NegotiationState, PeerEvent};
use async_trait::async_trait;
use consult_core::{IceCandidate, SessionDescription};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("peer connection is not initialized")]
    NotInitialized,

    #[error("peer connection was already initialized")]
    AlreadyInitialized,

    #[error("invalid session description: {0}")]
    InvalidDescription(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("native peer connection error: {0}")]
    Native(#[from] webrtc::Error),
}

/// One native peer-to-peer connection, driven through its offer/answer
/// states by a single caller.
///
/// Operations that are not valid in the current negotiation state report
/// that through their return value and leave the connection untouched.
#[async_trait]
pub trait PeerSession: Send + Sync {
    /// Builds the connection and starts emitting into `events`. Must be the
    /// first call and may only happen once.
    async fn initialize(&self, events: mpsc::Sender<PeerEvent>) -> Result<(), PeerError>;

    /// Captures local devices and attaches every track to the connection.
    async fn acquire_local_media(
        &self,
        want_video: bool,
        want_audio: bool,
    ) -> Result<LocalMedia, PeerError>;

    /// Creates and applies a local offer. `Ok(None)` when there is no
    /// connection or negotiation is not stable.
    async fn create_offer(&self) -> Result<Option<SessionDescription>, PeerError>;

    /// Applies a remote offer and answers it. `Ok(None)` when negotiation
    /// is not stable.
    async fn apply_remote_offer(
        &self,
        offer: &SessionDescription,
    ) -> Result<Option<SessionDescription>, PeerError>;

    /// `Ok(false)` unless a local offer is pending.
    async fn apply_remote_answer(&self, answer: &SessionDescription) -> Result<bool, PeerError>;

    /// `false` when the candidate could not be added yet.
    async fn add_remote_candidate(&self, candidate: &IceCandidate) -> bool;

    async fn has_remote_description(&self) -> bool;

    fn negotiation_state(&self) -> NegotiationState;

    /// Discards a pending local offer. `Ok(false)` if none was pending.
    async fn rollback_local_offer(&self) -> Result<bool, PeerError>;

    async fn set_audio_enabled(&self, enabled: bool) -> bool;

    /// Re-enabling a video track that has ended captures a fresh one and
    /// swaps it onto the live connection.
    async fn set_video_enabled(&self, enabled: bool) -> bool;

    fn local_media(&self) -> Option<LocalMedia>;

    /// Closes the connection then stops local tracks. Idempotent.
    async fn close(&self);
}
