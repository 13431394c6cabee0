use crate::media::TrackKind;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// One captured outgoing track.
///
/// Clones share the enabled and ended flags, so muting through any clone is
/// seen by the sender side too.
#[derive(Clone)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    enabled: Arc<AtomicBool>,
    ended: Arc<AtomicBool>,
    samples_sent: Arc<AtomicU64>,
    rtp: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, rtp: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            id: rtp.id().to_owned(),
            kind,
            enabled: Arc::new(AtomicBool::new(true)),
            ended: Arc::new(AtomicBool::new(false)),
            samples_sent: Arc::new(AtomicU64::new(0)),
            rtp,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Ends the capture. An ended track never comes back; re-enabling needs
    /// a fresh capture.
    pub fn stop(&self) {
        self.ended.store(true, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        !self.is_ended()
    }

    pub fn rtp(&self) -> Arc<TrackLocalStaticSample> {
        self.rtp.clone()
    }

    /// Frames written to the RTP track so far.
    pub fn samples_sent(&self) -> u64 {
        self.samples_sent.load(Ordering::Acquire)
    }

    pub(crate) fn record_sample(&self) {
        self.samples_sent.fetch_add(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Handle to the local capture of one call attempt.
///
/// Shared and mutable in place: a replaced track shows up for every clone.
#[derive(Clone)]
pub struct LocalMedia {
    stream_id: String,
    tracks: Arc<RwLock<Vec<LocalTrack>>>,
}

impl LocalMedia {
    pub fn new(stream_id: impl Into<String>, tracks: Vec<LocalTrack>) -> Self {
        Self {
            stream_id: stream_id.into(),
            tracks: Arc::new(RwLock::new(tracks)),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn tracks(&self) -> Vec<LocalTrack> {
        self.read().clone()
    }

    pub fn audio_tracks(&self) -> Vec<LocalTrack> {
        self.tracks_of(TrackKind::Audio)
    }

    pub fn video_tracks(&self) -> Vec<LocalTrack> {
        self.tracks_of(TrackKind::Video)
    }

    pub fn tracks_of(&self, kind: TrackKind) -> Vec<LocalTrack> {
        self.read()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.read().iter().any(|t| t.kind() == kind)
    }

    /// Sets the enabled flag on every track of `kind`. Returns whether any
    /// track was touched.
    pub fn set_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let tracks = self.read();
        let mut touched = false;
        for track in tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
            touched = true;
        }
        touched
    }

    /// Swaps in `track` for the existing track of the same kind, or appends
    /// it when there is none. Returns the track that was replaced.
    pub fn replace_track(&self, track: LocalTrack) -> Option<LocalTrack> {
        let mut tracks = self.write();
        match tracks.iter().position(|t| t.kind() == track.kind()) {
            Some(index) => Some(std::mem::replace(&mut tracks[index], track)),
            None => {
                tracks.push(track);
                None
            }
        }
    }

    pub fn stop_all(&self) {
        for track in self.read().iter() {
            track.stop();
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<LocalTrack>> {
        self.tracks.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<LocalTrack>> {
        self.tracks.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for LocalMedia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMedia")
            .field("stream_id", &self.stream_id)
            .field("tracks", &*self.read())
            .finish()
    }
}
