use consult_core::ConnectionState;
use consult_rtc::MemoryRelay;

use crate::integration::{init_tracing, settle, spawn_participant, test_room};
use crate::utils::ScriptedPeer;

#[tokio::test(start_paused = true)]
async fn test_leave_from_peer_clears_call_state() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, probe) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;
    patient
        .wait_for(|s| s.connection_state == ConnectionState::Connected)
        .await
        .expect("controller alive");
    assert!(patient.snapshot().remote_media.is_some());

    // A pending candidate must not survive the leave.
    probe.reject_next_candidates(1);
    clinician.candidate("stale");
    settle().await;

    clinician.leave();
    let snapshot = patient
        .wait_for(|s| s.connection_state == ConnectionState::Disconnected)
        .await
        .expect("controller alive");

    assert!(snapshot.remote_media.is_none());
    assert!(!snapshot.peer_present);
    assert!(snapshot.call_active);

    // Nothing queued may leak into a later exchange.
    clinician.offer("remote-offer-2");
    settle().await;
    assert!(probe.candidates().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_leave_from_stranger_is_ignored() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, _) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;

    let stranger = ScriptedPeer::join(relay.hub(), &test_room(), "user-m");
    stranger.leave();
    settle().await;

    let snapshot = patient.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert!(snapshot.peer_present);
    assert!(snapshot.remote_media.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_presence_loss_acts_as_leave() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, _) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;

    relay.hub().unsubscribe(&test_room().channel_name(), &clinician.id);

    let snapshot = patient
        .wait_for(|s| !s.peer_present)
        .await
        .expect("controller alive");
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
}
