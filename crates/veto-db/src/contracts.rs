//! Collaborator contracts consumed by the negotiation pipeline and the room
//! bridge.
//!
//! Each contract is an object-safe async trait so the service can hold
//! `Arc<dyn ...>` handles and swap the in-memory store for `PostgreSQL`
//! without touching callers.

use async_trait::async_trait;
use veto_types::{
    Action, ActionId, GameId, MapPool, MapPoolId, Room, RoomId, Session, SessionId, Side, UserId,
};

use crate::error::StoreError;

/// Persistence for veto sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session together with its ordered action history.
    async fn load(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// Load a session by its public share token.
    async fn load_by_share_token(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Insert or update the session row. The `actions` field is ignored;
    /// actions are written through [`ActionStore`].
    async fn save(&self, session: &Session) -> Result<(), StoreError>;

    /// Delete a session and every action it owns. Returns whether it existed.
    async fn delete(&self, id: SessionId) -> Result<bool, StoreError>;
}

/// Persistence for the append-only action history.
#[async_trait]
pub trait ActionStore: Send + Sync {
    /// Append an action. Fails with [`StoreError::Conflict`] when the
    /// session already has an action at the same step.
    async fn append(&self, action: &Action) -> Result<(), StoreError>;

    /// All actions of a session ordered by step.
    async fn list_by_session(&self, session_id: SessionId) -> Result<Vec<Action>, StoreError>;

    /// Record the chosen side on a pick. Returns whether the action exists.
    async fn update_side(&self, action_id: ActionId, side: Side) -> Result<bool, StoreError>;

    /// Remove a single action. Returns whether it existed.
    async fn delete_action(&self, action_id: ActionId) -> Result<bool, StoreError>;

    /// Remove every action of a session, returning how many were removed.
    async fn delete_all_for_session(&self, session_id: SessionId) -> Result<u64, StoreError>;
}

/// Read-only access to map pools.
#[async_trait]
pub trait MapPoolStore: Send + Sync {
    /// Load a pool with its maps in display order.
    async fn load_pool(&self, id: MapPoolId) -> Result<Option<MapPool>, StoreError>;

    /// Every pool of a game, ordered by name.
    async fn list_pools(&self, game_id: GameId) -> Result<Vec<MapPool>, StoreError>;
}

/// Room lookups used by the bridge and the connection adapter.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// The room currently owning the session, if any.
    async fn room_owning(&self, session_id: SessionId) -> Result<Option<RoomId>, StoreError>;

    /// The session currently attached to the room, if any.
    async fn active_session(&self, room_id: RoomId) -> Result<Option<SessionId>, StoreError>;

    /// Whether the user has joined the room.
    async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, StoreError>;
}

/// Room lifecycle on top of the read-only lookups.
#[async_trait]
pub trait RoomStore: RoomDirectory {
    /// Insert a room together with its initial participants. Fails with
    /// [`StoreError::Conflict`] when the ID is taken.
    async fn create_room(&self, room: &Room) -> Result<(), StoreError>;

    /// Load a room with its participants in join order.
    async fn load_room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;

    /// Add a participant. Returns `false` when the user had already joined.
    async fn join_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError>;

    /// Remove a participant. Returns whether the user was a participant.
    async fn leave_room(&self, id: RoomId, user_id: UserId) -> Result<bool, StoreError>;

    /// Delete a room and its participant list. Returns whether it existed.
    async fn delete_room(&self, id: RoomId) -> Result<bool, StoreError>;
}
