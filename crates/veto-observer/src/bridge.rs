//! Glue between the negotiation pipeline and the room hub.
//!
//! Every mutation entry point here calls [`VetoService`], and only after
//! the service has persisted and reloaded the session does it enqueue
//! exactly one broadcast into the room owning that session. A missing room
//! or a lookup failure is logged and never undoes the accepted mutation.
//!
//! The bridge holds its own per-session lock from the mutation until the
//! broadcast is queued, so broadcasts for one session reach the hub in
//! commit order.

use std::sync::Arc;

use tracing::{debug, warn};
use veto_core::locks::SessionLocks;
use veto_core::{MutationOutcome, VetoError, VetoService};
use veto_db::RoomDirectory;
use veto_types::{MapId, RoomId, SessionId, Side, Team, UserId};

use crate::hub::HubHandle;
use crate::protocol::{MutationPayload, RoomStatePayload, ServerMessage};

/// Builds the outbound frame variant for one mutation kind.
type Wrap = fn(Box<MutationPayload>) -> ServerMessage;

/// Pipeline front-end shared by the HTTP handlers and room connections.
pub struct VetoBridge {
    service: Arc<VetoService>,
    rooms: Arc<dyn RoomDirectory>,
    hub: HubHandle,
    /// Held across mutate-then-broadcast.
    order: SessionLocks,
}

impl core::fmt::Debug for VetoBridge {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VetoBridge")
            .field("service", &self.service)
            .field("hub", &self.hub)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

impl VetoBridge {
    /// Wire a service, a room directory and a running hub together.
    pub fn new(service: Arc<VetoService>, rooms: Arc<dyn RoomDirectory>, hub: HubHandle) -> Self {
        Self {
            service,
            rooms,
            hub,
            order: SessionLocks::new(),
        }
    }

    /// The underlying pipeline, for read-only queries.
    pub const fn service(&self) -> &Arc<VetoService> {
        &self.service
    }

    /// The hub this bridge broadcasts into.
    pub const fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Start a session and broadcast `start`.
    pub async fn start(
        &self,
        session_id: SessionId,
        user_id: Option<UserId>,
    ) -> Result<MutationPayload, VetoError> {
        let _order = self.order.acquire(session_id).await;
        let outcome = self.service.start(session_id).await?;
        Ok(self.publish(ServerMessage::Start, outcome, user_id).await)
    }

    /// Ban a map and broadcast `ban`.
    pub async fn ban(
        &self,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
        user_id: Option<UserId>,
    ) -> Result<MutationPayload, VetoError> {
        let _order = self.order.acquire(session_id).await;
        let outcome = self.service.ban(session_id, map_id, team).await?;
        Ok(self.publish(ServerMessage::Ban, outcome, user_id).await)
    }

    /// Pick a map and broadcast `pick`.
    pub async fn pick(
        &self,
        session_id: SessionId,
        map_id: MapId,
        team: Team,
        user_id: Option<UserId>,
    ) -> Result<MutationPayload, VetoError> {
        let _order = self.order.acquire(session_id).await;
        let outcome = self.service.pick(session_id, map_id, team).await?;
        Ok(self.publish(ServerMessage::Pick, outcome, user_id).await)
    }

    /// Select a side and broadcast `side-selection`.
    pub async fn select_side(
        &self,
        session_id: SessionId,
        team: Team,
        side: Side,
        user_id: Option<UserId>,
    ) -> Result<MutationPayload, VetoError> {
        let _order = self.order.acquire(session_id).await;
        let outcome = self.service.select_side(session_id, team, side).await?;
        Ok(self
            .publish(ServerMessage::SideSelection, outcome, user_id)
            .await)
    }

    /// Reset a session and broadcast `reset`.
    pub async fn reset(
        &self,
        session_id: SessionId,
        user_id: Option<UserId>,
    ) -> Result<MutationPayload, VetoError> {
        let _order = self.order.acquire(session_id).await;
        let outcome = self.service.reset(session_id).await?;
        Ok(self.publish(ServerMessage::Reset, outcome, user_id).await)
    }

    /// The session currently attached to a room.
    pub async fn active_session(&self, room_id: RoomId) -> Result<Option<SessionId>, VetoError> {
        Ok(self.rooms.active_session(room_id).await?)
    }

    /// Whether the user may open a connection to the room.
    pub async fn is_participant(&self, room_id: RoomId, user_id: UserId) -> Result<bool, VetoError> {
        Ok(self.rooms.is_participant(room_id, user_id).await?)
    }

    /// Snapshot sent to an observer right after it registers.
    pub async fn room_state(&self, room_id: RoomId) -> Result<RoomStatePayload, VetoError> {
        let Some(session_id) = self.active_session(room_id).await? else {
            return Ok(RoomStatePayload {
                room_id,
                session: None,
                next_action: None,
            });
        };
        let session = match self.service.session(session_id).await {
            Ok(session) => session,
            Err(VetoError::SessionNotFound) => {
                return Ok(RoomStatePayload {
                    room_id,
                    session: None,
                    next_action: None,
                });
            }
            Err(e) => return Err(e),
        };
        let pool = self.service.pool(session.map_pool_id).await?;
        let next_action = veto_rules::next_action(&session, &pool);
        Ok(RoomStatePayload {
            room_id,
            session: Some(session),
            next_action: Some(next_action),
        })
    }

    /// Queue the broadcast for an accepted mutation. Runs under the
    /// session's `order` lock.
    async fn publish(
        &self,
        wrap: Wrap,
        outcome: MutationOutcome,
        user_id: Option<UserId>,
    ) -> MutationPayload {
        let MutationOutcome {
            session,
            action,
            next_action,
        } = outcome;
        let payload = MutationPayload {
            session,
            action,
            next_action,
            user_id,
        };

        match self.rooms.room_owning(payload.session.id).await {
            Ok(Some(room_id)) => {
                self.hub.broadcast(room_id, wrap(Box::new(payload.clone())));
            }
            Ok(None) => {
                debug!(session_id = %payload.session.id, "Session has no room, nothing to broadcast");
            }
            Err(e) => {
                warn!(session_id = %payload.session.id, error = %e, "Room lookup failed, broadcast skipped");
            }
        }
        payload
    }
}
