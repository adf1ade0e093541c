use crate::integration::{create_relay, init_tracing};
use crate::utils::TestPeer;
use parley_core::ServerEvent;

#[tokio::test]
async fn join_is_acknowledged_and_announced() {
    init_tracing();
    let relay = create_relay();

    let mut a = TestPeer::connect(&relay);
    a.join(&relay, "a@x.com", "42");
    assert_eq!(a.recv().await, ServerEvent::RoomJoined {
        email: "a@x.com".into(),
        room: "42".into(),
    });

    let mut b = TestPeer::connect(&relay);
    b.join(&relay, "b@x.com", "42");

    // The existing member learns about the newcomer; the newcomer only gets
    // the ack.
    assert_eq!(a.recv().await, ServerEvent::UserJoined {
        email: "b@x.com".into(),
        id: b.id,
    });
    assert_eq!(b.recv().await, ServerEvent::RoomJoined {
        email: "b@x.com".into(),
        room: "42".into(),
    });
    assert!(b.queue_empty());
}

#[tokio::test]
async fn third_join_is_rejected_without_disturbing_members() {
    init_tracing();
    let relay = create_relay();

    let mut a = TestPeer::connect(&relay);
    let mut b = TestPeer::connect(&relay);
    a.join(&relay, "a@x.com", "42");
    b.join(&relay, "b@x.com", "42");
    a.recv().await; // ack
    a.recv().await; // user:joined
    b.recv().await; // ack

    let mut c = TestPeer::connect(&relay);
    c.join(&relay, "c@x.com", "42");

    assert_eq!(c.recv().await, ServerEvent::RoomFull { room: "42".into() });
    assert!(a.queue_empty(), "existing members must not be affected");
    assert!(b.queue_empty(), "existing members must not be affected");
    assert_eq!(relay.registry().members(&"42".into()).len(), 2);
}

#[tokio::test]
async fn disconnect_notifies_remaining_members() {
    init_tracing();
    let relay = create_relay();

    let mut a = TestPeer::connect(&relay);
    let b = TestPeer::connect(&relay);
    a.join(&relay, "a@x.com", "42");
    b.join(&relay, "b@x.com", "42");
    a.recv().await;
    a.recv().await;

    relay.disconnect(b.id);

    assert_eq!(a.recv().await, ServerEvent::UserLeft { id: b.id });
    assert!(relay.registry().room_of(b.id).is_none());
}

#[tokio::test]
async fn departed_member_receives_nothing_afterwards() {
    init_tracing();
    let relay = create_relay();

    let mut a = TestPeer::connect(&relay);
    let mut b = TestPeer::connect(&relay);
    a.join(&relay, "a@x.com", "42");
    b.join(&relay, "b@x.com", "42");
    a.recv().await;
    a.recv().await;
    b.recv().await;

    relay.disconnect(b.id);
    a.recv().await; // user:left

    // Everything addressed to the departed connection bounces back to the
    // sender; b's queue stays silent.
    a.send(&relay, parley_core::ClientEvent::EndCall { to: b.id });
    assert!(matches!(a.recv().await, ServerEvent::RelayError { .. }));
    assert!(b.queue_empty());
}

#[tokio::test]
async fn empty_room_is_recreated_on_next_join() {
    init_tracing();
    let relay = create_relay();

    let a = TestPeer::connect(&relay);
    a.join(&relay, "a@x.com", "42");
    relay.disconnect(a.id);
    assert!(relay.registry().members(&"42".into()).is_empty());

    let mut b = TestPeer::connect(&relay);
    b.join(&relay, "b@x.com", "42");
    assert_eq!(b.recv().await, ServerEvent::RoomJoined {
        email: "b@x.com".into(),
        room: "42".into(),
    });
}
