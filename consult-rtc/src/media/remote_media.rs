use crate::media::TrackKind;
use std::fmt;
use std::sync::Arc;
use webrtc::track::track_remote::TrackRemote;

/// A track received from the peer.
#[derive(Clone)]
pub struct RemoteTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    native: Option<Arc<TrackRemote>>,
}

impl RemoteTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind, stream_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            stream_id: stream_id.into(),
            native: None,
        }
    }

    /// Returns `None` for tracks whose kind could not be determined.
    pub fn from_native(track: Arc<TrackRemote>) -> Option<Self> {
        let kind = TrackKind::from_codec_type(track.kind())?;
        Some(Self {
            id: track.id(),
            kind,
            stream_id: track.stream_id(),
            native: Some(track),
        })
    }

    /// The underlying RTP track, when this came from a live connection.
    pub fn native(&self) -> Option<Arc<TrackRemote>> {
        self.native.clone()
    }
}

impl fmt::Debug for RemoteTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

impl PartialEq for RemoteTrack {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.kind == other.kind && self.stream_id == other.stream_id
    }
}

/// Handle to what the peer is sending, keyed by its stream id.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteMedia {
    stream_id: String,
    tracks: Vec<RemoteTrack>,
}

impl RemoteMedia {
    pub fn from_track(track: RemoteTrack) -> Self {
        Self {
            stream_id: track.stream_id.clone(),
            tracks: vec![track],
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> &[RemoteTrack] {
        &self.tracks
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }

    /// Folds a newly arrived track into the handle. A track from the same
    /// stream extends it; one from another stream yields a new handle.
    pub fn with_track(mut self, track: RemoteTrack) -> Self {
        if track.stream_id != self.stream_id {
            return Self::from_track(track);
        }
        if !self.tracks.iter().any(|t| t.id == track.id) {
            self.tracks.push(track);
        }
        self
    }
}
