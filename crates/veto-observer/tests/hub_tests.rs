//! Tests for the room broadcast hub.
//!
//! Observers are plain bounded channels registered through [`HubHandle`],
//! so membership, ordering and eviction are checked without any socket.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use veto_observer::hub::{Frame, Hub, HubError, HubHandle, Registration};
use veto_observer::protocol::ServerMessage;
use veto_types::{ConnectionId, RoomId, UserId};

struct Observer {
    connection_id: ConnectionId,
    user_id: UserId,
    frames: mpsc::Receiver<Frame>,
}

impl Observer {
    async fn next(&mut self) -> Value {
        let frame = timeout(Duration::from_secs(2), self.frames.recv())
            .await
            .unwrap()
            .unwrap();
        serde_json::from_str(&frame).unwrap()
    }

    async fn closed(&mut self) -> bool {
        timeout(Duration::from_secs(2), self.frames.recv())
            .await
            .unwrap()
            .is_none()
    }
}

async fn join(hub: &HubHandle, room_id: RoomId, capacity: usize) -> Observer {
    let (outbound, frames) = mpsc::channel(capacity);
    let connection_id = ConnectionId::new();
    let user_id = UserId::new();
    hub.register(Registration {
        room_id,
        user_id,
        connection_id,
        outbound,
    })
    .await
    .unwrap();
    Observer {
        connection_id,
        user_id,
        frames,
    }
}

fn marker(label: &str) -> ServerMessage {
    ServerMessage::error(label, "marker")
}

fn message_of(frame: &Value) -> &str {
    frame["data"]["message"].as_str().unwrap_or_default()
}

// =============================================================================
// Membership
// =============================================================================

#[tokio::test]
async fn join_is_announced_to_existing_members_only() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut first = join(&handle, room, 16).await;
    let mut second = join(&handle, room, 16).await;

    let announced = first.next().await;
    assert_eq!(announced["type"], "room:join");
    assert_eq!(announced["data"]["user_id"], second.user_id.to_string());
    assert_eq!(
        announced["data"]["connection_id"],
        second.connection_id.to_string()
    );
    assert_eq!(announced["data"]["members"], 2);

    assert!(second.frames.try_recv().is_err());
    assert_eq!(handle.member_count(room).await, 2);
    hub.stop().await;
}

#[tokio::test]
async fn unregister_closes_queue_and_announces_leave() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut first = join(&handle, room, 16).await;
    let mut second = join(&handle, room, 16).await;
    first.next().await;

    handle.unregister(room, second.connection_id);

    let left = first.next().await;
    assert_eq!(left["type"], "room:leave");
    assert_eq!(left["data"]["user_id"], second.user_id.to_string());
    assert_eq!(left["data"]["members"], 1);
    assert!(second.closed().await);
    assert_eq!(handle.member_count(room).await, 1);
    hub.stop().await;
}

#[tokio::test]
async fn empty_room_is_discarded() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut only = join(&handle, room, 4).await;
    handle.unregister(room, only.connection_id);
    assert!(only.closed().await);

    // Registration is acknowledged only after earlier requests ran.
    let _other = join(&handle, RoomId::new(), 4).await;
    assert_eq!(handle.member_count(room).await, 0);
    assert_eq!(handle.room_count().await, 1);
    hub.stop().await;
}

#[tokio::test]
async fn members_snapshot_lists_connections() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let first = join(&handle, room, 4).await;
    let second = join(&handle, room, 4).await;

    let mut users: Vec<UserId> = handle
        .members(room)
        .await
        .into_iter()
        .map(|m| m.user_id)
        .collect();
    users.sort();
    let mut expected = vec![first.user_id, second.user_id];
    expected.sort();
    assert_eq!(users, expected);
    assert!(handle.members(RoomId::new()).await.is_empty());
    hub.stop().await;
}

// =============================================================================
// Broadcast ordering
// =============================================================================

#[tokio::test]
async fn three_observers_see_broadcasts_in_enqueue_order() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut observers = vec![
        join(&handle, room, 16).await,
        join(&handle, room, 16).await,
        join(&handle, room, 16).await,
    ];

    handle.broadcast(room, marker("b1"));
    handle.broadcast(room, marker("b2"));

    for observer in &mut observers {
        let mut seen = Vec::new();
        while seen.len() < 2 {
            let frame = observer.next().await;
            if frame["type"] == "error" {
                seen.push(message_of(&frame).to_owned());
            }
        }
        assert_eq!(seen, ["b1", "b2"]);
    }
    hub.stop().await;
}

#[tokio::test]
async fn observer_never_receives_broadcasts_enqueued_before_it_joined() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut early = join(&handle, room, 16).await;
    handle.broadcast(room, marker("before"));
    let mut late = join(&handle, room, 16).await;
    handle.broadcast(room, marker("after"));

    let first_seen = late.next().await;
    assert_eq!(message_of(&first_seen), "after");

    assert_eq!(message_of(&early.next().await), "before");
    assert_eq!(early.next().await["type"], "room:join");
    assert_eq!(message_of(&early.next().await), "after");
    hub.stop().await;
}

#[tokio::test]
async fn broadcast_to_unknown_room_is_ignored() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();
    let mut member = join(&handle, room, 4).await;

    handle.broadcast(RoomId::new(), marker("elsewhere"));
    handle.broadcast(room, marker("here"));

    assert_eq!(message_of(&member.next().await), "here");
    hub.stop().await;
}

// =============================================================================
// Slow consumers
// =============================================================================

#[tokio::test]
async fn stuck_observer_is_evicted_without_blocking_the_room() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut first = join(&handle, room, 16).await;
    let mut second = join(&handle, room, 16).await;
    // Never drained, room for one frame only.
    let mut stuck = join(&handle, room, 1).await;

    handle.broadcast(room, marker("b1"));
    handle.broadcast(room, marker("b2"));
    handle.broadcast(room, marker("b3"));

    for observer in [&mut first, &mut second] {
        let mut seen = Vec::new();
        while seen.len() < 3 {
            let frame = observer.next().await;
            if frame["type"] == "error" {
                seen.push(message_of(&frame).to_owned());
            }
        }
        assert_eq!(seen, ["b1", "b2", "b3"]);
    }

    assert_eq!(handle.member_count(room).await, 2);
    assert_eq!(message_of(&stuck.next().await), "b1");
    assert!(stuck.closed().await);
    hub.stop().await;
}

#[tokio::test]
async fn dropped_receiver_is_removed_on_next_delivery() {
    let hub = Hub::start();
    let handle = hub.handle();
    let room = RoomId::new();

    let mut kept = join(&handle, room, 16).await;
    let gone = join(&handle, room, 16).await;
    kept.next().await;
    drop(gone);

    handle.broadcast(room, marker("b1"));
    assert_eq!(message_of(&kept.next().await), "b1");
    assert_eq!(handle.member_count(room).await, 1);
    hub.stop().await;
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn stop_closes_every_queue_and_rejects_new_members() {
    let hub = Hub::start();
    let handle = hub.handle();
    let mut a = join(&handle, RoomId::new(), 4).await;
    let mut b = join(&handle, RoomId::new(), 4).await;

    hub.stop().await;

    assert!(a.closed().await);
    assert!(b.closed().await);

    let (outbound, _frames) = mpsc::channel(1);
    let result = handle
        .register(Registration {
            room_id: RoomId::new(),
            user_id: UserId::new(),
            connection_id: ConnectionId::new(),
            outbound,
        })
        .await;
    assert_eq!(result, Err(HubError::Stopped));
}
