//! In-process implementation of every storage contract.
//!
//! Backs the default `memory` storage backend and the test suites. All
//! tables live behind one [`tokio::sync::RwLock`], so each contract call is
//! atomic with respect to every other call on the same store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use veto_types::{
    Action, ActionId, GameId, MapPool, MapPoolId, Room, RoomId, Session, SessionId, Side, UserId,
};

use crate::contracts::{ActionStore, MapPoolStore, RoomDirectory, RoomStore, SessionStore};
use crate::error::StoreError;

#[derive(Debug)]
struct RoomEntry {
    name: String,
    owner_id: Option<UserId>,
    session_id: Option<SessionId>,
    /// Join order.
    participants: Vec<UserId>,
    created_at: DateTime<Utc>,
}

impl RoomEntry {
    fn blank() -> Self {
        Self {
            name: String::new(),
            owner_id: None,
            session_id: None,
            participants: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn to_room(&self, id: RoomId) -> Room {
        Room {
            id,
            name: self.name.clone(),
            owner_id: self.owner_id,
            session_id: self.session_id,
            participants: self.participants.clone(),
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    /// Per-session actions keyed by step, so iteration is step-ordered.
    actions: HashMap<SessionId, BTreeMap<u32, Action>>,
    pools: HashMap<MapPoolId, MapPool>,
    rooms: HashMap<RoomId, RoomEntry>,
}

impl Tables {
    fn assemble(&self, session: &Session) -> Session {
        let mut full = session.clone();
        full.actions = self
            .actions
            .get(&session.id)
            .map(|steps| steps.values().cloned().collect())
            .unwrap_or_default();
        full
    }

    fn find_action_mut(&mut self, action_id: ActionId) -> Option<&mut Action> {
        self.actions
            .values_mut()
            .flat_map(BTreeMap::values_mut)
            .find(|a| a.id == action_id)
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a map pool.
    pub async fn insert_pool(&self, pool: MapPool) {
        self.tables.write().await.pools.insert(pool.id, pool);
    }

    /// Seed an empty, ownerless room.
    pub async fn insert_room(&self, room_id: RoomId) {
        self.tables
            .write()
            .await
            .rooms
            .entry(room_id)
            .or_insert_with(RoomEntry::blank);
    }

    /// Add a participant to a room, creating the room if needed.
    pub async fn add_participant(&self, room_id: RoomId, user_id: UserId) {
        let mut tables = self.tables.write().await;
        let room = tables.rooms.entry(room_id).or_insert_with(RoomEntry::blank);
        if !room.participants.contains(&user_id) {
            room.participants.push(user_id);
        }
    }

    /// Make `session_id` the room's active session, replacing any previous
    /// one. `None` detaches the current session.
    pub async fn attach_session(&self, room_id: RoomId, session_id: Option<SessionId>) {
        self.tables
            .write()
            .await
            .rooms
            .entry(room_id)
            .or_insert_with(RoomEntry::blank)
            .session_id = session_id;
    }
}

#[async_trait]
impl SessionStore for InMemoryStore {
    async fn load(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(&id).map(|s| tables.assemble(s)))
    }

    async fn load_by_share_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.share_token == token)
            .map(|s| tables.assemble(s)))
    }

    async fn save(&self, session: &Session) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let clash = tables
            .sessions
            .values()
            .any(|s| s.id != session.id && s.share_token == session.share_token);
        if clash {
            return Err(StoreError::Conflict(String::from("share token already in use")));
        }
        let mut row = session.clone();
        row.actions.clear();
        tables.sessions.insert(row.id, row);
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        tables.actions.remove(&id);
        for room in tables.rooms.values_mut() {
            if room.session_id == Some(id) {
                room.session_id = None;
            }
        }
        Ok(tables.sessions.remove(&id).is_some())
    }
}

#[async_trait]
impl ActionStore for InMemoryStore {
    async fn append(&self, action: &Action) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let steps = tables.actions.entry(action.session_id).or_default();
        if steps.contains_key(&action.step) {
            return Err(StoreError::Conflict(format!(
                "session {} already has an action at step {}",
                action.session_id, action.step
            )));
        }
        steps.insert(action.step, action.clone());
        Ok(())
    }

    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Action>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .actions
            .get(&session_id)
            .map(|steps| steps.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_side(&self, action_id: ActionId, side: Side) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(action) = tables.find_action_mut(action_id) else {
            return Ok(false);
        };
        action.selected_side = Some(side);
        Ok(true)
    }

    async fn delete_action(&self, action_id: ActionId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let mut removed = false;
        for steps in tables.actions.values_mut() {
            let before = steps.len();
            steps.retain(|_, a| a.id != action_id);
            removed |= steps.len() != before;
        }
        Ok(removed)
    }

    async fn delete_all_for_session(&self, session_id: SessionId) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .actions
            .remove(&session_id)
            .map_or(0, |steps| steps.len());
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl MapPoolStore for InMemoryStore {
    async fn load_pool(&self, id: MapPoolId) -> Result<Option<MapPool>, StoreError> {
        Ok(self.tables.read().await.pools.get(&id).cloned())
    }

    async fn list_pools(&self, game_id: GameId) -> Result<Vec<MapPool>, StoreError> {
        let tables = self.tables.read().await;
        let mut pools: Vec<MapPool> = tables
            .pools
            .values()
            .filter(|p| p.game_id == game_id)
            .cloned()
            .collect();
        pools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pools)
    }
}

#[async_trait]
impl RoomDirectory for InMemoryStore {
    async fn room_owning(&self, session_id: SessionId) -> Result<Option<RoomId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rooms
            .iter()
            .find(|(_, room)| room.session_id == Some(session_id))
            .map(|(id, _)| *id))
    }

    async fn active_session(&self, room_id: RoomId) -> Result<Option<SessionId>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.rooms.get(&room_id).and_then(|room| room.session_id))
    }

    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .rooms
            .get(&room_id)
            .is_some_and(|room| room.participants.contains(&user_id)))
    }
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn create_room(&self, room: &Room) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.rooms.contains_key(&room.id) {
            return Err(StoreError::Conflict(format!("room {} already exists", room.id)));
        }
        let mut participants: Vec<UserId> = Vec::with_capacity(room.participants.len());
        for user_id in &room.participants {
            if !participants.contains(user_id) {
                participants.push(*user_id);
            }
        }
        tables.rooms.insert(
            room.id,
            RoomEntry {
                name: room.name.clone(),
                owner_id: room.owner_id,
                session_id: room.session_id,
                participants,
                created_at: room.created_at,
            },
        );
        Ok(())
    }

    async fn load_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.rooms.get(&id).map(|entry| entry.to_room(id)))
    }

    async fn join_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(room) = tables.rooms.get_mut(&id) else {
            return Ok(false);
        };
        if room.participants.contains(&user_id) {
            return Ok(false);
        }
        room.participants.push(user_id);
        Ok(true)
    }

    async fn leave_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(room) = tables.rooms.get_mut(&id) else {
            return Ok(false);
        };
        let before = room.participants.len();
        room.participants.retain(|p| *p != user_id);
        Ok(room.participants.len() != before)
    }

    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.rooms.remove(&id).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use veto_types::{ActionKind, MapId, SessionStatus, Team, VetoFormat};

    use super::*;

    fn session() -> Session {
        let now = Utc::now();
        Session {
            id: SessionId::new(),
            owner_id: None,
            map_pool_id: MapPoolId::new(),
            format: VetoFormat::Bo3,
            status: SessionStatus::NotStarted,
            team_a_name: String::from("Alpha"),
            team_b_name: String::from("Bravo"),
            current_team: Team::A,
            decider_map_id: None,
            decider_side: None,
            timer_seconds: 30,
            share_token: String::from("0123456789abcdef0123456789abcdef"),
            created_at: now,
            updated_at: now,
            finished_at: None,
            actions: Vec::new(),
        }
    }

    fn action(session_id: SessionId, step: u32) -> Action {
        Action {
            id: ActionId::new(),
            session_id,
            map_id: MapId::new(),
            team: Team::A,
            kind: ActionKind::Pick,
            step,
            selected_side: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn load_assembles_actions_in_step_order() {
        let store = InMemoryStore::new();
        let s = session();
        store.save(&s).await.ok();
        store.append(&action(s.id, 2)).await.ok();
        store.append(&action(s.id, 1)).await.ok();

        let loaded = store.load(s.id).await.ok().flatten();
        let steps: Vec<u32> = loaded
            .map(|l| l.actions.iter().map(|a| a.step).collect())
            .unwrap_or_default();
        assert_eq!(steps, [1, 2]);
    }

    #[tokio::test]
    async fn duplicate_step_conflicts() {
        let store = InMemoryStore::new();
        let s = session();
        assert!(store.append(&action(s.id, 1)).await.is_ok());
        let second = store.append(&action(s.id, 1)).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn update_side_and_delete_action() {
        let store = InMemoryStore::new();
        let s = session();
        let a = action(s.id, 1);
        store.append(&a).await.ok();

        assert!(matches!(store.update_side(a.id, Side::Defence).await, Ok(true)));
        let listed = store.list_by_session(s.id).await.unwrap_or_default();
        assert_eq!(listed.first().and_then(|x| x.selected_side), Some(Side::Defence));

        assert!(matches!(store.delete_action(a.id).await, Ok(true)));
        assert!(matches!(store.delete_action(a.id).await, Ok(false)));
    }

    #[tokio::test]
    async fn delete_all_counts_removed_actions() {
        let store = InMemoryStore::new();
        let s = session();
        for step in 1..=3 {
            store.append(&action(s.id, step)).await.ok();
        }
        assert!(matches!(store.delete_all_for_session(s.id).await, Ok(3)));
        assert!(store.list_by_session(s.id).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn share_token_lookup() {
        let store = InMemoryStore::new();
        let s = session();
        store.save(&s).await.ok();
        let found = store.load_by_share_token(&s.share_token).await.ok().flatten();
        assert_eq!(found.map(|f| f.id), Some(s.id));
        let missing = store.load_by_share_token("nope").await.ok().flatten();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn room_directory_tracks_attachment_and_participants() {
        let store = InMemoryStore::new();
        let room = RoomId::new();
        let user = UserId::new();
        let s = session();

        store.add_participant(room, user).await;
        store.attach_session(room, Some(s.id)).await;

        assert!(matches!(store.room_owning(s.id).await, Ok(Some(r)) if r == room));
        assert!(matches!(store.active_session(room).await, Ok(Some(id)) if id == s.id));
        assert!(matches!(store.is_participant(room, user).await, Ok(true)));
        assert!(matches!(store.is_participant(room, UserId::new()).await, Ok(false)));

        store.attach_session(room, None).await;
        assert!(matches!(store.room_owning(s.id).await, Ok(None)));
    }

    #[tokio::test]
    async fn room_lifecycle_keeps_join_order() {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let guest = UserId::new();
        let room = Room {
            id: RoomId::new(),
            name: String::from("Scrim"),
            owner_id: Some(owner),
            session_id: Some(SessionId::new()),
            participants: vec![owner],
            created_at: Utc::now(),
        };

        store.create_room(&room).await.unwrap();
        assert!(matches!(
            store.create_room(&room).await,
            Err(StoreError::Conflict(_))
        ));

        assert!(store.join_room(room.id, guest).await.unwrap());
        assert!(!store.join_room(room.id, guest).await.unwrap());
        assert!(!store.join_room(RoomId::new(), guest).await.unwrap());
        let loaded = store.load_room(room.id).await.unwrap().unwrap();
        assert_eq!(loaded.participants, vec![owner, guest]);
        assert_eq!(loaded.session_id, room.session_id);

        assert!(store.leave_room(room.id, owner).await.unwrap());
        assert!(!store.leave_room(room.id, owner).await.unwrap());
        let loaded = store.load_room(room.id).await.unwrap().unwrap();
        assert_eq!(loaded.participants, vec![guest]);

        assert!(store.delete_room(room.id).await.unwrap());
        assert!(store.load_room(room.id).await.unwrap().is_none());
        assert!(matches!(store.room_owning(room.session_id.unwrap()).await, Ok(None)));
    }

    #[tokio::test]
    async fn pools_are_listed_per_game_by_name() {
        let store = InMemoryStore::new();
        let game = GameId::new();
        let pool = |name: &str, game_id: GameId| MapPool {
            id: MapPoolId::new(),
            game_id,
            name: String::from(name),
            maps: Vec::new(),
        };
        store.insert_pool(pool("Competitive Maps", game)).await;
        store.insert_pool(pool("All Maps", game)).await;
        store.insert_pool(pool("Other Game", GameId::new())).await;

        let names: Vec<String> = store
            .list_pools(game)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["All Maps", "Competitive Maps"]);
    }
}
