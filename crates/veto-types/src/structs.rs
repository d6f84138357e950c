//! Core entity structs: sessions, actions, map pools, maps and rooms.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ActionKind, SessionStatus, Side, Team, VetoFormat};
use crate::ids::{ActionId, GameId, MapId, MapPoolId, RoomId, SessionId, UserId};

/// Upper bound for the per-turn timer shown to clients.
pub const MAX_TIMER_SECONDS: u16 = 300;

/// One veto negotiation between two teams.
///
/// The session exclusively owns its [`Action`] history. `current_team`
/// always equals the team whose turn the rules engine computes from the
/// number of recorded actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// User who created the session, if authenticated.
    pub owner_id: Option<UserId>,
    /// Pool the maps are negotiated from.
    pub map_pool_id: MapPoolId,
    /// Match format fixing the negotiation script.
    pub format: VetoFormat,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Display name of team A.
    pub team_a_name: String,
    /// Display name of team B.
    pub team_b_name: String,
    /// Team whose turn it currently is.
    pub current_team: Team,
    /// Decider map chosen once the script completes.
    pub decider_map_id: Option<MapId>,
    /// Starting side drawn for the decider (three- and five-map formats).
    pub decider_side: Option<Side>,
    /// Per-turn timer shown to clients, 0 disables it.
    pub timer_seconds: u16,
    /// Token granting read-only public access.
    pub share_token: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last persisted change.
    pub updated_at: DateTime<Utc>,
    /// Completion timestamp.
    pub finished_at: Option<DateTime<Utc>>,
    /// Ordered action history, step 1 first.
    pub actions: Vec<Action>,
}

impl Session {
    /// The most recent action, if any.
    pub fn last_action(&self) -> Option<&Action> {
        self.actions.last()
    }
}

/// A single ban or pick of one map by one team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Action {
    /// Action identifier.
    pub id: ActionId,
    /// Owning session.
    pub session_id: SessionId,
    /// The banned or picked map.
    pub map_id: MapId,
    /// The acting team.
    pub team: Team,
    /// Ban or pick.
    pub kind: ActionKind,
    /// 1-based position in the session's history.
    pub step: u32,
    /// Starting side chosen by the opposing team after a pick.
    pub selected_side: Option<Side>,
    /// When the action was recorded.
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Whether this is a pick still waiting for its side selection.
    pub const fn awaits_side(&self) -> bool {
        matches!(self.kind, ActionKind::Pick) && self.selected_side.is_none()
    }
}

/// A playable map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameMap {
    /// Map identifier.
    pub id: MapId,
    /// Display name.
    pub name: String,
    /// URL-safe short name.
    pub slug: String,
}

/// The set of candidate maps for a negotiation, scoped to one game.
///
/// Read-only for the duration of a negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapPool {
    /// Pool identifier.
    pub id: MapPoolId,
    /// Game the pool belongs to.
    pub game_id: GameId,
    /// Display name.
    pub name: String,
    /// Member maps.
    pub maps: Vec<GameMap>,
}

impl MapPool {
    /// Whether the map is a member of this pool.
    pub fn contains(&self, map_id: MapId) -> bool {
        self.maps.iter().any(|m| m.id == map_id)
    }
}

/// Participants gathered around at most one negotiation.
///
/// A room refers to its session by ID only; deleting the room leaves the
/// session untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Room {
    /// Room identifier.
    pub id: RoomId,
    /// Display name.
    pub name: String,
    /// Creating user. Rooms seeded outside the API may have none.
    pub owner_id: Option<UserId>,
    /// The negotiation the room currently follows.
    pub session_id: Option<SessionId>,
    /// Joined users, in join order.
    pub participants: Vec<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Whether the user has joined.
    pub fn has_participant(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// Whether the user created the room.
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(selected_side: Option<Side>) -> Action {
        Action {
            id: ActionId::new(),
            session_id: SessionId::new(),
            map_id: MapId::new(),
            team: Team::A,
            kind: ActionKind::Pick,
            step: 3,
            selected_side,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pick_awaits_side_until_selected() {
        assert!(pick(None).awaits_side());
        assert!(!pick(Some(Side::Attack)).awaits_side());
    }

    #[test]
    fn pool_membership() {
        let map = GameMap {
            id: MapId::new(),
            name: String::from("Ascent"),
            slug: String::from("ascent"),
        };
        let pool = MapPool {
            id: MapPoolId::new(),
            game_id: GameId::new(),
            name: String::from("Competitive"),
            maps: vec![map.clone()],
        };
        assert!(pool.contains(map.id));
        assert!(!pool.contains(MapId::new()));
    }

    #[test]
    fn room_membership_and_ownership() {
        let owner = UserId::new();
        let guest = UserId::new();
        let room = Room {
            id: RoomId::new(),
            name: String::from("Scrim"),
            owner_id: Some(owner),
            session_id: None,
            participants: vec![owner, guest],
            created_at: Utc::now(),
        };
        assert!(room.has_participant(guest));
        assert!(!room.has_participant(UserId::new()));
        assert!(room.is_owner(owner));
        assert!(!room.is_owner(guest));
    }
}
