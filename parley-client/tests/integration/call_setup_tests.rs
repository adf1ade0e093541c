use crate::utils::{
    create_relay, eventually, init_tracing, joined_pair, no_media, spawn_client,
};
use parley_client::EngineEvent;
use parley_core::{
    ConnectionId, MediaConstraints, NegotiationState, RemoteTrack, ServerEvent, TrackKind,
};
use std::time::Duration;

#[tokio::test]
async fn call_establishes_both_sides() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = joined_pair(&relay, no_media()).await;

    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;

    assert_eq!(a.engines.engine_count(), 1);
    assert_eq!(b.engines.engine_count(), 1);
    assert_eq!(a.engines.last_engine().offer_count(), 1);
    assert_eq!(b.engines.last_engine().answer_count(), 1);
}

#[tokio::test]
async fn caller_tracks_attach_after_the_answer() {
    init_tracing();
    let relay = create_relay();
    let mut a = spawn_client(&relay, "a@x.com", MediaConstraints::default()).await;
    a.join("42").await;
    tokio::task::yield_now().await;
    let mut b = spawn_client(&relay, "b@x.com", no_media()).await;
    b.join("42").await;
    a.wait_for(NegotiationState::CallerReady).await;

    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;

    // Both acquired tracks queued behind the initial round; after the answer
    // they attach and each attachment runs its own renegotiation round.
    let a_engine = a.engines.last_engine();
    eventually("caller tracks attached and rounds settled", || {
        a_engine.track_count() == 2
            && a_engine.applied_answer_count() == 3
            && a.state() == NegotiationState::Established
    })
    .await;
    assert_eq!(a_engine.offer_count(), 3);
    assert_eq!(b.engines.last_engine().answer_count(), 3);
    assert_eq!(b.state(), NegotiationState::Established);
}

#[tokio::test]
async fn callee_tracks_flow_back_through_renegotiation() {
    init_tracing();
    let relay = create_relay();
    let mut a = spawn_client(&relay, "a@x.com", no_media()).await;
    a.join("42").await;
    tokio::task::yield_now().await;
    let mut b = spawn_client(&relay, "b@x.com", MediaConstraints::default()).await;
    b.join("42").await;
    a.wait_for(NegotiationState::CallerReady).await;

    a.handle.start_call().await;
    b.wait_for(NegotiationState::Established).await;
    a.wait_for(NegotiationState::Established).await;

    // The callee attaches its media only after answering; each track comes
    // back to the caller as a renegotiation offer from the callee side.
    let b_engine = b.engines.last_engine();
    eventually("callee tracks attached and rounds settled", || {
        b_engine.track_count() == 2
            && b_engine.applied_answer_count() == 2
            && b.state() == NegotiationState::Established
    })
    .await;
    assert_eq!(b_engine.offer_count(), 2);
    assert_eq!(a.engines.last_engine().answer_count(), 2);
    assert_eq!(b.devices.acquisition_count(), 1);
}

#[tokio::test]
async fn call_with_media_on_both_sides_settles() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = joined_pair(&relay, MediaConstraints::default()).await;

    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;

    // Both sides attach two tracks right after establishment, so both dial
    // renegotiation rounds into each other at once. The rounds must resolve
    // through the glare tie-break rather than stall.
    let a_engine = a.engines.last_engine();
    let b_engine = b.engines.last_engine();
    eventually("both sides' tracks attached and every round resolved", || {
        a_engine.track_count() == 2
            && b_engine.track_count() == 2
            && a.state() == NegotiationState::Established
            && b.state() == NegotiationState::Established
    })
    .await;

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(a.state(), NegotiationState::Established);
    assert_eq!(b.state(), NegotiationState::Established);
    assert_eq!(a.engines.engine_count(), 1);
    assert_eq!(b.engines.engine_count(), 1);
    // Only the lower id ever yields a colliding round.
    let impolite = if a.id < b.id { &b_engine } else { &a_engine };
    assert_eq!(impolite.rollback_count(), 0);
}

#[tokio::test]
async fn start_without_discovered_peer_does_nothing() {
    init_tracing();
    let relay = create_relay();
    let a = spawn_client(&relay, "solo@x.com", no_media()).await;
    a.join("42").await;

    a.handle.start_call().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(a.state(), NegotiationState::Idle);
    assert_eq!(a.engines.engine_count(), 0);
}

#[tokio::test]
async fn caller_denied_media_sends_nothing() {
    init_tracing();
    let relay = create_relay();
    let (a, b) = joined_pair(&relay, MediaConstraints::default()).await;

    a.devices.deny_access();
    a.handle.start_call().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The call dies before anything reaches signaling.
    assert_eq!(a.state(), NegotiationState::CallerReady);
    assert_eq!(a.engines.engine_count(), 0);
    assert_eq!(a.devices.acquisition_count(), 0);
    assert_eq!(b.state(), NegotiationState::Idle);
    assert_eq!(b.engines.engine_count(), 0);
}

#[tokio::test]
async fn callee_denied_media_leaves_offer_unanswered() {
    init_tracing();
    let relay = create_relay();
    let (mut a, b) = joined_pair(&relay, MediaConstraints::default()).await;

    b.devices.deny_access();
    a.handle.start_call().await;
    a.wait_for(NegotiationState::AwaitingAnswer).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(b.state(), NegotiationState::Idle);
    assert_eq!(b.engines.engine_count(), 0);
    assert_eq!(a.state(), NegotiationState::AwaitingAnswer);
}

#[tokio::test]
async fn offer_to_departed_peer_is_non_fatal() {
    init_tracing();
    let relay = create_relay();
    let mut a = spawn_client(&relay, "a@x.com", no_media()).await;
    a.join("42").await;

    // Announce a peer that is not actually connected; the relay reports the
    // failed delivery but local negotiation state survives.
    let ghost = ConnectionId::new();
    a.inject
        .send(ServerEvent::UserJoined {
            email: "ghost@x.com".into(),
            id: ghost,
        })
        .unwrap();
    a.wait_for(NegotiationState::CallerReady).await;

    a.handle.start_call().await;
    a.wait_for(NegotiationState::AwaitingAnswer).await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(a.state(), NegotiationState::AwaitingAnswer);
}

#[tokio::test]
async fn remote_track_is_surfaced() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = joined_pair(&relay, no_media()).await;

    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;

    let track = RemoteTrack {
        id: "inbound-cam".into(),
        kind: TrackKind::Video,
    };
    a.engines
        .last_engine()
        .emit(EngineEvent::TrackReceived(track.clone()))
        .await;

    let received = tokio::time::timeout(Duration::from_millis(500), a.remote_tracks.recv())
        .await
        .expect("no remote track surfaced")
        .expect("track channel closed");
    assert_eq!(received, track);
    assert_eq!(a.state(), NegotiationState::Established);
}
