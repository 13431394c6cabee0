use consult_core::ConnectionState;
use consult_rtc::MemoryRelay;

use crate::integration::{init_tracing, settle, spawn_participant, test_room};
use crate::utils::{ScriptedPeer, SessionCall};

#[tokio::test(start_paused = true)]
async fn test_early_candidates_drain_in_arrival_order() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, probe) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.candidate("c1");
    clinician.candidate("c2");
    clinician.candidate("c3");
    settle().await;

    assert!(probe.candidates().is_empty(), "nothing added before the offer");

    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;
    settle().await;

    assert_eq!(probe.candidates(), ["c1", "c2", "c3"]);

    let calls = probe.calls();
    let offer_at = calls
        .iter()
        .position(|c| *c == SessionCall::ApplyOffer("remote-offer".into()))
        .expect("offer applied");
    let first_candidate_at = calls
        .iter()
        .position(|c| matches!(c, SessionCall::AddCandidate(_)))
        .expect("candidate added");
    assert!(offer_at < first_candidate_at);

    assert_eq!(
        patient.snapshot().connection_state,
        ConnectionState::Connected
    );
}

#[tokio::test(start_paused = true)]
async fn test_candidates_after_description_are_added_directly() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, probe) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;

    clinician.candidate("late-1");
    clinician.candidate("late-2");
    settle().await;

    assert_eq!(probe.candidates(), ["late-1", "late-2"]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_candidate_is_requeued_not_lost() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, probe) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;

    probe.reject_next_candidates(1);
    clinician.candidate("flaky");
    settle().await;
    assert!(probe.candidates().is_empty());

    // The next description exchange drains the queue again.
    clinician.offer("remote-offer-2");
    clinician.expect_signal("answer").await;
    settle().await;

    assert_eq!(probe.candidates(), ["flaky"]);
}
