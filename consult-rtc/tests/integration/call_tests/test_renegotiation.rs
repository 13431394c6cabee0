use consult_core::ParticipantId;
use consult_rtc::{MemoryRelay, PeerEvent};

use crate::integration::{init_tracing, settle, spawn_participant, test_room};
use crate::utils::{ScriptedPeer, offers_from};

#[tokio::test(start_paused = true)]
async fn test_offerer_renegotiates_on_track_change() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (clinician, probe) = spawn_participant(&relay, "user-z");
    clinician.start_call().await.expect("start");

    let mut patient = ScriptedPeer::join(relay.hub(), &test_room(), "user-a");
    patient.expect_signal("offer").await;
    patient.answer("answer-1");
    settle().await;

    probe.emit(PeerEvent::NegotiationNeeded).await;
    let offer = patient.expect_signal("offer").await;
    assert_eq!(offer.sender_id(), &ParticipantId::from("user-z"));
    assert_eq!(probe.offers_created(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_renegotiation_is_not_reentrant() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (clinician, probe) = spawn_participant(&relay, "user-z");
    clinician.start_call().await.expect("start");

    let mut patient = ScriptedPeer::join(relay.hub(), &test_room(), "user-a");
    patient.expect_signal("offer").await;

    // Offer still unanswered: further notifications are swallowed.
    probe.emit(PeerEvent::NegotiationNeeded).await;
    probe.emit(PeerEvent::NegotiationNeeded).await;
    settle().await;

    assert!(offers_from(&patient.drain()).is_empty());
    assert_eq!(probe.offers_created(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_answerer_leaves_renegotiation_to_peer() {
    init_tracing();

    let relay = MemoryRelay::new();
    let (patient, probe) = spawn_participant(&relay, "user-a");
    patient.start_call().await.expect("start");

    let mut clinician = ScriptedPeer::join(relay.hub(), &test_room(), "user-z");
    clinician.offer("remote-offer");
    clinician.expect_signal("answer").await;

    probe.emit(PeerEvent::NegotiationNeeded).await;
    settle().await;

    assert_eq!(probe.offers_created(), 0);
    assert!(offers_from(&clinician.drain()).is_empty());
}
