use crate::media::sample_pump::spawn_sample_pump;
use crate::media::{LocalTrack, TrackKind};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("permission to capture media was denied")]
    PermissionDenied,

    #[error("requested capture device is unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConstraints {
    pub width: u32,
    pub height: u32,
    pub facing_mode: FacingMode,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            facing_mode: FacingMode::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// What to capture. `None` means the kind is not wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub stream_id: String,
    pub video: Option<VideoConstraints>,
    pub audio: Option<AudioConstraints>,
}

impl CaptureRequest {
    pub fn new(stream_id: impl Into<String>, want_video: bool, want_audio: bool) -> Self {
        Self {
            stream_id: stream_id.into(),
            video: want_video.then(VideoConstraints::default),
            audio: want_audio.then(AudioConstraints::default),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_none() && self.audio.is_none()
    }
}

/// Access to capture devices.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Captures every requested kind or fails as a whole.
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<LocalTrack>, MediaError>;
}

/// Device-less capture producing Opus and VP8 sample tracks.
///
/// Each track is fed synthetic frames while it is enabled, until stopped.
///
/// Used by the CLI and by tests; it can pretend the camera or microphone is
/// missing, or that the user refused access.
#[derive(Debug, Clone)]
pub struct SyntheticMediaSource {
    camera: bool,
    microphone: bool,
    permission: bool,
}

impl Default for SyntheticMediaSource {
    fn default() -> Self {
        Self {
            camera: true,
            microphone: true,
            permission: true,
        }
    }
}

impl SyntheticMediaSource {
    pub fn without_camera(mut self) -> Self {
        self.camera = false;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.microphone = false;
        self
    }

    pub fn denying_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    fn make_track(&self, kind: TrackKind, stream_id: &str) -> LocalTrack {
        let codec = match kind {
            TrackKind::Audio => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            TrackKind::Video => RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                clock_rate: 90000,
                ..Default::default()
            },
        };

        let id = format!("{}-{}", kind, uuid::Uuid::new_v4().simple());
        let rtp = Arc::new(TrackLocalStaticSample::new(codec, id, stream_id.to_owned()));
        let track = LocalTrack::new(kind, rtp);
        spawn_sample_pump(track.clone());
        track
    }
}

#[async_trait]
impl MediaSource for SyntheticMediaSource {
    async fn capture(&self, request: &CaptureRequest) -> Result<Vec<LocalTrack>, MediaError> {
        if request.is_empty() {
            warn!("Capture requested with neither audio nor video");
            return Err(MediaError::Unavailable);
        }
        if !self.permission {
            return Err(MediaError::PermissionDenied);
        }
        if (request.video.is_some() && !self.camera)
            || (request.audio.is_some() && !self.microphone)
        {
            return Err(MediaError::Unavailable);
        }

        let mut tracks = Vec::with_capacity(2);
        if request.audio.is_some() {
            tracks.push(self.make_track(TrackKind::Audio, &request.stream_id));
        }
        if let Some(video) = &request.video {
            debug!(
                "Capturing synthetic video {}x{} ({:?})",
                video.width, video.height, video.facing_mode
            );
            tracks.push(self.make_track(TrackKind::Video, &request.stream_id));
        }
        Ok(tracks)
    }
}
