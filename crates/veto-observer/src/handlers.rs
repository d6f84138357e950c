//! REST and WebSocket endpoint handlers.
//!
//! Every mutation goes through the [`VetoBridge`](crate::bridge::VetoBridge),
//! so a change made over HTTP reaches the room's observers exactly like one
//! made over a room connection.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/veto/sessions` | Create a session |
//! | `GET` | `/api/veto/sessions/{id}` | Session with its actions |
//! | `GET` | `/api/veto/sessions/share/{token}` | Session by share token |
//! | `GET` | `/api/veto/sessions/{id}/next-action` | What the session expects next |
//! | `POST` | `/api/veto/sessions/{id}/start` | Start the negotiation |
//! | `POST` | `/api/veto/sessions/{id}/ban` | Ban a map |
//! | `POST` | `/api/veto/sessions/{id}/pick` | Pick a map |
//! | `POST` | `/api/veto/sessions/{id}/select-side` | Choose a pick's starting side |
//! | `POST` | `/api/veto/sessions/{id}/reset` | Reset the negotiation |
//! | `GET` | `/api/veto/sessions/{id}/room` | Room following the session |
//! | `GET` | `/api/map-pools/{id}` | Map pool with its maps |
//! | `GET` | `/api/games/{id}/map-pools` | Every pool of a game |
//! | `POST` | `/api/rooms` | Create a room around a session |
//! | `GET` | `/api/rooms/{id}` | Room with its participants |
//! | `POST` | `/api/rooms/{id}/join` | Join a room |
//! | `POST` | `/api/rooms/{id}/leave` | Leave a room |
//! | `GET` | `/api/rooms/{id}/observers` | Connected observers of a room |
//! | `GET` | `/ws/rooms/{id}?user_id=` | Room WebSocket |

use std::sync::Arc;

use axum::Json;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use veto_core::{NewRoom, NewSession, VetoError, parse_side, parse_team};
use veto_rules::NextAction;
use veto_types::{
    GameId, MapId, MapPool, MapPoolId, Room, RoomId, Session, SessionId, UserId, VetoFormat,
};

use crate::connection;
use crate::error::ApiError;
use crate::hub::MemberInfo;
use crate::protocol::MutationPayload;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/veto/sessions`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// Pool to negotiate from.
    pub map_pool_id: MapPoolId,
    /// Match format.
    pub format: VetoFormat,
    /// Display name of team A.
    pub team_a_name: String,
    /// Display name of team B.
    pub team_b_name: String,
    /// Per-turn timer, 0 to 300 seconds.
    #[serde(default)]
    pub timer_seconds: u16,
    /// Creating user, if known.
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

/// Body of the ban and pick endpoints.
#[derive(Debug, Deserialize)]
pub struct MapActionRequest {
    /// Map to ban or pick.
    pub map_id: MapId,
    /// Acting team, `"A"` or `"B"`.
    pub team: String,
}

/// Body of `POST /api/veto/sessions/{id}/select-side`.
#[derive(Debug, Deserialize)]
pub struct SideSelectionRequest {
    /// Team choosing the side.
    pub team: String,
    /// `"attack"` or `"defence"`.
    pub side: String,
}

/// Body of `POST /api/rooms`.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Display name.
    pub name: String,
    /// Creating user, joined as the first participant.
    pub owner_id: UserId,
    /// Session the room follows.
    pub session_id: SessionId,
}

/// Body of the join and leave endpoints.
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    /// Joining or leaving user.
    pub user_id: UserId,
}

/// Response of `POST /api/rooms/{id}/leave`.
#[derive(Debug, Serialize)]
pub struct LeaveRoomResponse {
    /// The room left.
    pub room_id: RoomId,
    /// What remains of the room, `null` once it was deleted.
    pub room: Option<Room>,
}

/// Query string of the room WebSocket upgrade.
#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    /// User opening the connection.
    pub user_id: Uuid,
}

/// Response of `GET /api/rooms/{id}/observers`.
#[derive(Debug, Serialize)]
pub struct ObserversResponse {
    /// The room.
    pub room_id: RoomId,
    /// Currently connected observers.
    pub members: Vec<MemberInfo>,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Create a session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .service()
        .create_session(NewSession {
            owner_id: body.owner_id,
            map_pool_id: body.map_pool_id,
            format: body.format,
            team_a_name: body.team_a_name,
            team_b_name: body.team_b_name,
            timer_seconds: body.timer_seconds,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Load a session.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.service().session(SessionId::from(id)).await?))
}

/// Load a session by share token.
pub async fn get_shared_session(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.service().session_by_share_token(&token).await?))
}

/// Summarize what the session expects next.
pub async fn get_next_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<NextAction>, ApiError> {
    Ok(Json(state.service().next_action(SessionId::from(id)).await?))
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Start a session.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationPayload>, ApiError> {
    Ok(Json(state.bridge.start(SessionId::from(id), None).await?))
}

/// Ban a map.
pub async fn ban_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MapActionRequest>,
) -> Result<Json<MutationPayload>, ApiError> {
    let team = parse_team(&body.team)?;
    let payload = state
        .bridge
        .ban(SessionId::from(id), body.map_id, team, None)
        .await?;
    Ok(Json(payload))
}

/// Pick a map.
pub async fn pick_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MapActionRequest>,
) -> Result<Json<MutationPayload>, ApiError> {
    let team = parse_team(&body.team)?;
    let payload = state
        .bridge
        .pick(SessionId::from(id), body.map_id, team, None)
        .await?;
    Ok(Json(payload))
}

/// Choose the starting side for the latest pick.
pub async fn select_side(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<SideSelectionRequest>,
) -> Result<Json<MutationPayload>, ApiError> {
    let team = parse_team(&body.team)?;
    let side = parse_side(&body.side)?;
    let payload = state
        .bridge
        .select_side(SessionId::from(id), team, side, None)
        .await?;
    Ok(Json(payload))
}

/// Reset a session.
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MutationPayload>, ApiError> {
    Ok(Json(state.bridge.reset(SessionId::from(id), None).await?))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Load a map pool.
pub async fn get_map_pool(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MapPool>, ApiError> {
    Ok(Json(state.service().pool(MapPoolId::from(id)).await?))
}

/// List the pools of a game.
pub async fn list_game_pools(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<MapPool>>, ApiError> {
    Ok(Json(state.service().pools_for_game(GameId::from(id)).await?))
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Create a room around a session.
pub async fn create_room(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), ApiError> {
    let room = state
        .rooms
        .create(NewRoom {
            name: body.name,
            owner_id: body.owner_id,
            session_id: body.session_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// Load a room.
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.rooms.room(RoomId::from(id)).await?))
}

/// Load the room following a session.
pub async fn get_session_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(
        state.rooms.room_for_session(SessionId::from(id)).await?,
    ))
}

/// Join a room.
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<Room>, ApiError> {
    Ok(Json(state.rooms.join(RoomId::from(id), body.user_id).await?))
}

/// Leave a room, deleting it when the owner leaves or fewer than two
/// participants remain.
pub async fn leave_room(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<LeaveRoomResponse>, ApiError> {
    let room_id = RoomId::from(id);
    let room = state.rooms.leave(room_id, body.user_id).await?;
    Ok(Json(LeaveRoomResponse { room_id, room }))
}

/// List the observers connected to a room.
pub async fn list_observers(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Json<ObserversResponse> {
    let room_id = RoomId::from(id);
    let members = state.hub().members(room_id).await;
    Json(ObserversResponse { room_id, members })
}

/// Upgrade to a room WebSocket after checking room participation.
///
/// The upgrade itself is validated last so a non-participant always gets
/// `403`, whatever its handshake looks like.
pub async fn room_socket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<SocketQuery>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let room_id = RoomId::from(id);
    let user_id = UserId::from(query.user_id);

    match state.bridge.is_participant(room_id, user_id).await {
        Ok(true) => {}
        Ok(false) => return ApiError(VetoError::Unauthorized).into_response(),
        Err(e) => return ApiError(e).into_response(),
    }

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let bridge = Arc::clone(&state.bridge);
    let settings = state.connection;
    upgrade
        .max_message_size(settings.max_message_bytes)
        .on_upgrade(move |socket| connection::serve(socket, bridge, room_id, user_id, settings))
}
