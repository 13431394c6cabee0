use crate::media::{LocalTrack, TrackKind};
use bytes::Bytes;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use webrtc::media::Sample;

/// Opus TOC byte plus an empty frame: decodes as 20 ms of silence.
const OPUS_SILENCE: &[u8] = &[0xf8, 0xff, 0xfe];

/// Placeholder VP8 payload. Keeps RTP flowing; it is not a decodable picture.
const VP8_PLACEHOLDER: &[u8] = &[0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a];

const AUDIO_FRAME: Duration = Duration::from_millis(20);
const VIDEO_FRAME: Duration = Duration::from_millis(33);

/// Starts feeding `track` with synthetic frames.
///
/// Frames are written only while the track is enabled. The task ends once
/// the track is stopped or the RTP track refuses a write.
pub(crate) fn spawn_sample_pump(track: LocalTrack) {
    tokio::spawn(pump(track));
}

async fn pump(track: LocalTrack) {
    let (payload, frame) = match track.kind() {
        TrackKind::Audio => (Bytes::from_static(OPUS_SILENCE), AUDIO_FRAME),
        TrackKind::Video => (Bytes::from_static(VP8_PLACEHOLDER), VIDEO_FRAME),
    };

    let rtp = track.rtp();
    let mut ticker = tokio::time::interval(frame);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if track.is_ended() {
            break;
        }
        if !track.is_enabled() {
            continue;
        }

        let sample = Sample {
            data: payload.clone(),
            duration: frame,
            ..Default::default()
        };
        if let Err(e) = rtp.write_sample(&sample).await {
            warn!("Stopping sample pump for {}: {}", track.id(), e);
            break;
        }
        track.record_sample();
    }

    debug!("Sample pump for {} finished", track.id());
}
