//! Integration tests for the room lifecycle against the in-memory store.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::sync::Arc;

use veto_core::{ErrorCategory, NewRoom, NewSession, RoomService, VetoError, VetoService};
use veto_db::{InMemoryStore, RoomDirectory};
use veto_types::{GameId, GameMap, MapId, MapPool, MapPoolId, SessionId, UserId, VetoFormat};

struct Rooms {
    store: Arc<InMemoryStore>,
    rooms: RoomService,
    session_id: SessionId,
    owner: UserId,
}

impl Rooms {
    async fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let pool = MapPool {
            id: MapPoolId::new(),
            game_id: GameId::new(),
            name: String::from("Competitive"),
            maps: (0..7)
                .map(|i| GameMap {
                    id: MapId::new(),
                    name: format!("Map {i}"),
                    slug: format!("map-{i}"),
                })
                .collect(),
        };
        store.insert_pool(pool.clone()).await;
        let session = VetoService::from_store(&store)
            .create_session(NewSession {
                owner_id: None,
                map_pool_id: pool.id,
                format: VetoFormat::Bo3,
                team_a_name: String::from("Alpha"),
                team_b_name: String::from("Bravo"),
                timer_seconds: 0,
            })
            .await
            .unwrap();
        Self {
            rooms: RoomService::from_store(&store),
            store,
            session_id: session.id,
            owner: UserId::new(),
        }
    }

    fn new_room(&self, name: &str) -> NewRoom {
        NewRoom {
            name: String::from(name),
            owner_id: self.owner,
            session_id: self.session_id,
        }
    }
}

#[tokio::test]
async fn create_binds_the_session_and_joins_the_owner() {
    let t = Rooms::new().await;
    let room = t.rooms.create(t.new_room("  Scrim  ")).await.unwrap();

    assert_eq!(room.name, "Scrim");
    assert_eq!(room.owner_id, Some(t.owner));
    assert_eq!(room.session_id, Some(t.session_id));
    assert_eq!(room.participants, vec![t.owner]);

    assert_eq!(t.store.room_owning(t.session_id).await.unwrap(), Some(room.id));
    let by_session = t.rooms.room_for_session(t.session_id).await.unwrap();
    assert_eq!(by_session.id, room.id);
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let t = Rooms::new().await;

    let blank = t.rooms.create(t.new_room("   ")).await.unwrap_err();
    assert!(matches!(blank, VetoError::Validation(_)));

    let mut missing = t.new_room("Scrim");
    missing.session_id = SessionId::new();
    let missing = t.rooms.create(missing).await.unwrap_err();
    assert!(matches!(missing, VetoError::SessionNotFound));

    t.rooms.create(t.new_room("First")).await.unwrap();
    let taken = t.rooms.create(t.new_room("Second")).await.unwrap_err();
    assert!(matches!(taken, VetoError::SessionInRoom));
    assert_eq!(taken.category(), ErrorCategory::Conflict);
}

#[tokio::test]
async fn concurrent_creates_claim_the_session_once() {
    let t = Arc::new(Rooms::new().await);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let t = Arc::clone(&t);
            tokio::spawn(async move { t.rooms.create(t.new_room(&format!("Room {i}"))).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            created += 1;
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn join_then_join_again_conflicts() {
    let t = Rooms::new().await;
    let room = t.rooms.create(t.new_room("Scrim")).await.unwrap();
    let guest = UserId::new();

    let joined = t.rooms.join(room.id, guest).await.unwrap();
    assert_eq!(joined.participants, vec![t.owner, guest]);

    let again = t.rooms.join(room.id, guest).await.unwrap_err();
    assert!(matches!(again, VetoError::AlreadyInRoom));

    let unknown = t.rooms.join(veto_types::RoomId::new(), guest).await.unwrap_err();
    assert!(matches!(unknown, VetoError::RoomNotFound));
}

#[tokio::test]
async fn leaving_keeps_the_room_while_two_remain() {
    let t = Rooms::new().await;
    let room = t.rooms.create(t.new_room("Scrim")).await.unwrap();
    let (b, c) = (UserId::new(), UserId::new());
    t.rooms.join(room.id, b).await.unwrap();
    t.rooms.join(room.id, c).await.unwrap();

    let left = t.rooms.leave(room.id, b).await.unwrap().unwrap();
    assert_eq!(left.participants, vec![t.owner, c]);

    // Down to the owner alone: the room goes away.
    assert!(t.rooms.leave(room.id, c).await.unwrap().is_none());
    assert!(matches!(
        t.rooms.room(room.id).await,
        Err(VetoError::RoomNotFound)
    ));
    assert_eq!(t.store.room_owning(t.session_id).await.unwrap(), None);
}

#[tokio::test]
async fn owner_leaving_deletes_the_room() {
    let t = Rooms::new().await;
    let room = t.rooms.create(t.new_room("Scrim")).await.unwrap();
    t.rooms.join(room.id, UserId::new()).await.unwrap();

    assert!(t.rooms.leave(room.id, t.owner).await.unwrap().is_none());
    assert!(matches!(
        t.rooms.room_for_session(t.session_id).await,
        Err(VetoError::RoomNotFound)
    ));

    // The session outlives its room and can be claimed again.
    let again = t.rooms.create(t.new_room("Rematch")).await.unwrap();
    assert_eq!(again.session_id, Some(t.session_id));
}

#[tokio::test]
async fn strangers_cannot_leave() {
    let t = Rooms::new().await;
    let room = t.rooms.create(t.new_room("Scrim")).await.unwrap();

    let err = t.rooms.leave(room.id, UserId::new()).await.unwrap_err();
    assert!(matches!(err, VetoError::Unauthorized));
    assert_eq!(t.rooms.room(room.id).await.unwrap().participants, vec![t.owner]);
}
