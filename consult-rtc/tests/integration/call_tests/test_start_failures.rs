use consult_core::{ConnectionState, RoomId};
use consult_rtc::{CallConfig, CallError, MediaError, MemoryRelay, SyntheticMediaSource};
use std::sync::Arc;

use crate::integration::{init_tracing, spawn_mock_call, test_config, test_room};
use crate::utils::{FailingRelay, SessionCall, SilentRelay, media_failure};

#[tokio::test(start_paused = true)]
async fn test_rejected_subscription_is_transport_unavailable() {
    init_tracing();

    let (handle, probe) = spawn_mock_call(
        Arc::new(FailingRelay),
        test_config("user-a"),
        SyntheticMediaSource::default(),
    );

    let err = handle.start_call().await.unwrap_err();
    assert!(matches!(err, CallError::TransportUnavailable(_)));

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Failed);
    assert_eq!(snapshot.last_error, Some(err));
    assert!(!snapshot.call_active);
    assert_eq!(probe.count(&SessionCall::Close), 1);
    assert_eq!(probe.count(&SessionCall::AcquireMedia), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unresponsive_relay_times_out() {
    init_tracing();

    let (handle, _) = spawn_mock_call(
        Arc::new(SilentRelay),
        test_config("user-a"),
        SyntheticMediaSource::default(),
    );

    let err = handle.start_call().await.unwrap_err();
    assert!(matches!(err, CallError::TransportUnavailable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_media_failures_are_distinguishable() {
    init_tracing();

    for (failure, expected) in [
        (MediaError::PermissionDenied, CallError::MediaAcquisitionDenied),
        (MediaError::Unavailable, CallError::MediaUnavailable),
    ] {
        let relay = MemoryRelay::new();
        let (handle, probe) = spawn_mock_call(
            Arc::new(relay.clone()),
            test_config("user-a"),
            media_failure(failure),
        );

        assert_eq!(handle.start_call().await, Err(expected.clone()));
        assert_eq!(handle.snapshot().last_error, Some(expected));
        assert_eq!(probe.count(&SessionCall::Close), 1);

        // The half-built attempt must not linger on the relay.
        assert!(relay.hub().present(&test_room().channel_name()).is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn test_empty_room_is_generic_failure() {
    init_tracing();

    let (handle, probe) = spawn_mock_call(
        Arc::new(MemoryRelay::new()),
        CallConfig::new(RoomId::new("  ")),
        SyntheticMediaSource::default(),
    );

    assert!(matches!(
        handle.start_call().await,
        Err(CallError::Failed(_))
    ));
    assert_eq!(probe.sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_audio_only_start_and_repeated_start() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (handle, probe) = spawn_mock_call(
        Arc::new(relay),
        test_config("user-a").without_video(),
        SyntheticMediaSource::default().without_camera(),
    );

    handle.start_call().await.expect("audio-only start");
    let snapshot = handle.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Connecting);
    assert!(snapshot.last_error.is_none());
    assert_eq!(
        snapshot.local_media.expect("local media").video_tracks().len(),
        0
    );

    // Starting again while active changes nothing.
    handle.start_call().await.expect("second start");
    assert_eq!(probe.sessions(), 1);
}
