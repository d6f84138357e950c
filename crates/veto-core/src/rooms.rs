//! Room lifecycle: creating a room around a session, joining and leaving.
//!
//! A room follows at most one session and a session belongs to at most one
//! room. The owner joins on creation. A room is deleted when its owner
//! leaves or when fewer than two participants remain.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use veto_db::{RoomStore, SessionStore};
use veto_types::{Room, RoomId, SessionId, UserId};

use crate::error::VetoError;

/// Longest accepted room name, in characters.
pub const MAX_ROOM_NAME_CHARS: usize = 100;

/// Input for [`RoomService::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoom {
    /// Display name.
    pub name: String,
    /// Creating user, joined as the first participant.
    pub owner_id: UserId,
    /// Session the room follows.
    pub session_id: SessionId,
}

/// Creates rooms and manages their participants.
pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
    sessions: Arc<dyn SessionStore>,
    /// Serializes creation so two rooms never claim the same session.
    creating: Mutex<()>,
}

impl core::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoomService").finish_non_exhaustive()
    }
}

impl RoomService {
    /// Create a service over the given contracts.
    pub fn new(rooms: Arc<dyn RoomStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            rooms,
            sessions,
            creating: Mutex::new(()),
        }
    }

    /// Create a service whose contracts are served by one store.
    pub fn from_store<S>(store: &Arc<S>) -> Self
    where
        S: RoomStore + SessionStore + 'static,
    {
        let rooms: Arc<dyn RoomStore> = Arc::clone(store) as Arc<dyn RoomStore>;
        let sessions: Arc<dyn SessionStore> = Arc::clone(store) as Arc<dyn SessionStore>;
        Self::new(rooms, sessions)
    }

    /// Load a room with its participants.
    pub async fn room(&self, room_id: RoomId) -> Result<Room, VetoError> {
        self.rooms
            .load_room(room_id)
            .await?
            .ok_or(VetoError::RoomNotFound)
    }

    /// The room following a session.
    pub async fn room_for_session(&self, session_id: SessionId) -> Result<Room, VetoError> {
        let room_id = self
            .rooms
            .room_owning(session_id)
            .await?
            .ok_or(VetoError::RoomNotFound)?;
        self.room(room_id).await
    }

    /// Create a room around an existing session with the owner joined.
    pub async fn create(&self, input: NewRoom) -> Result<Room, VetoError> {
        let name = input.name.trim();
        let len = name.chars().count();
        if len == 0 || len > MAX_ROOM_NAME_CHARS {
            return Err(VetoError::Validation(format!(
                "name must be 1 to {MAX_ROOM_NAME_CHARS} characters"
            )));
        }

        let _creating = self.creating.lock().await;
        if self.sessions.load(input.session_id).await?.is_none() {
            return Err(VetoError::SessionNotFound);
        }
        if self.rooms.room_owning(input.session_id).await?.is_some() {
            return Err(VetoError::SessionInRoom);
        }

        let room = Room {
            id: RoomId::new(),
            name: name.to_owned(),
            owner_id: Some(input.owner_id),
            session_id: Some(input.session_id),
            participants: vec![input.owner_id],
            created_at: Utc::now(),
        };
        self.rooms.create_room(&room).await?;
        info!(
            room_id = %room.id,
            session_id = %input.session_id,
            owner_id = %input.owner_id,
            "Room created"
        );
        self.room(room.id).await
    }

    /// Join a room.
    pub async fn join(&self, room_id: RoomId, user_id: UserId) -> Result<Room, VetoError> {
        self.room(room_id).await?;
        if !self.rooms.join_room(room_id, user_id).await? {
            return Err(VetoError::AlreadyInRoom);
        }
        info!(%room_id, %user_id, "Participant joined room");
        self.room(room_id).await
    }

    /// Leave a room. Returns the remaining room, or `None` once it was
    /// deleted.
    pub async fn leave(&self, room_id: RoomId, user_id: UserId) -> Result<Option<Room>, VetoError> {
        let room = self.room(room_id).await?;
        if !room.has_participant(user_id) {
            return Err(VetoError::Unauthorized);
        }
        if room.is_owner(user_id) {
            self.rooms.delete_room(room_id).await?;
            info!(%room_id, %user_id, "Owner left, room deleted");
            return Ok(None);
        }

        self.rooms.leave_room(room_id, user_id).await?;
        let room = self.room(room_id).await?;
        if room.participants.len() < 2 {
            self.rooms.delete_room(room_id).await?;
            info!(%room_id, %user_id, "Too few participants left, room deleted");
            return Ok(None);
        }
        info!(%room_id, %user_id, "Participant left room");
        Ok(Some(room))
    }
}
