use crate::utils::{create_relay, init_tracing, joined_pair, no_media, TestClient};
use parley_client::EngineEvent;
use parley_core::NegotiationState;
use std::sync::Arc;
use std::time::Duration;

async fn established_pair(
    relay: &Arc<parley_server::RelayServer>,
) -> (TestClient, TestClient) {
    let (mut a, mut b) = joined_pair(relay, no_media()).await;
    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;
    (a, b)
}

#[tokio::test]
async fn hangup_idles_both_sides() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = established_pair(&relay).await;

    a.handle.end_call().await;
    a.wait_for(NegotiationState::Idle).await;
    b.wait_for(NegotiationState::Idle).await;

    assert!(a.engines.last_engine().is_closed());
    assert!(b.engines.last_engine().is_closed());
}

#[tokio::test]
async fn second_hangup_is_a_noop() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = established_pair(&relay).await;

    a.handle.end_call().await;
    a.wait_for(NegotiationState::Idle).await;
    b.wait_for(NegotiationState::Idle).await;

    a.handle.end_call().await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(a.state(), NegotiationState::Idle);
    assert_eq!(b.state(), NegotiationState::Idle);
    assert_eq!(a.engines.engine_count(), 1);
}

#[tokio::test]
async fn calling_again_after_hangup_works() {
    init_tracing();
    let relay = create_relay();
    let (mut a, mut b) = established_pair(&relay).await;

    a.handle.end_call().await;
    a.wait_for(NegotiationState::Idle).await;
    b.wait_for(NegotiationState::Idle).await;

    // The pair is still in the room; a second call mints fresh engines.
    a.handle.start_call().await;
    a.wait_for(NegotiationState::Established).await;
    b.wait_for(NegotiationState::Established).await;

    assert_eq!(a.engines.engine_count(), 2);
    assert_eq!(b.engines.engine_count(), 2);
    assert!(!a.engines.engine(1).is_closed());
}

#[tokio::test]
async fn engine_transport_loss_tears_the_call_down() {
    init_tracing();
    let relay = create_relay();
    let (a, mut b) = established_pair(&relay).await;

    b.engines.last_engine().emit(EngineEvent::Closed).await;
    b.wait_for(NegotiationState::Idle).await;

    assert!(b.engines.last_engine().is_closed());
    // Transport loss is inferred locally; nothing went over signaling.
    assert_eq!(a.state(), NegotiationState::Established);
}

#[tokio::test]
async fn peer_disconnect_tears_the_call_down() {
    init_tracing();
    let relay = create_relay();
    let (mut a, b) = established_pair(&relay).await;

    relay.disconnect(b.id);
    a.wait_for(NegotiationState::Idle).await;
    assert!(a.engines.last_engine().is_closed());

    // The peer is gone, so dialing again has no target.
    a.handle.start_call().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(a.state(), NegotiationState::Idle);
    assert_eq!(a.engines.engine_count(), 1);
}
