//! Wire protocol for room WebSocket connections.
//!
//! Every frame in both directions is a JSON envelope
//! `{ "type": <string>, "data": <payload> }`. Inbound envelopes are decoded
//! in a single dispatch step into [`InboundCommand`]; outbound frames are
//! produced by serializing a [`ServerMessage`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use veto_rules::NextAction;
use veto_types::{Action, ConnectionId, MapId, RoomId, Session, SessionId, UserId};

/// Error code sent when a frame is not a valid envelope.
pub const INVALID_MESSAGE_CODE: &str = "invalid_message";

/// Error code sent for an envelope whose `type` is not recognized.
pub const UNKNOWN_TYPE_CODE: &str = "unknown_message_type";

/// Error code sent when the connection's room has no active session.
pub const NO_ACTIVE_SESSION_CODE: &str = "no_active_session";

/// Error code sent when a command names a session the room does not own.
pub const SESSION_MISMATCH_CODE: &str = "session_mismatch";

/// Failure to turn a raw frame into an [`InboundCommand`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not a JSON envelope.
    #[error("invalid message format")]
    Malformed,

    /// The envelope's `type` is not one of the recognized commands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The `data` payload does not fit the command's shape.
    #[error("invalid message data: {0}")]
    InvalidData(String),
}

impl ProtocolError {
    /// Stable machine-readable code for the outbound `error` frame.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed | Self::InvalidData(_) => INVALID_MESSAGE_CODE,
            Self::UnknownType(_) => UNKNOWN_TYPE_CODE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Payload of `ban` and `pick`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapCommand {
    /// Session the command targets.
    pub session_id: SessionId,
    /// Map to ban or pick.
    pub map_id: MapId,
    /// Acting team, `"A"` or `"B"`.
    pub team: String,
}

/// Payload of `side-selection`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SideCommand {
    /// Session the command targets.
    pub session_id: SessionId,
    /// Team choosing the side.
    pub team: String,
    /// `"attack"` or `"defence"`.
    pub side: String,
}

/// Payload of `start` and `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SessionCommand {
    /// Session the command targets.
    pub session_id: SessionId,
}

/// A decoded inbound command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// Ban a map.
    Ban(MapCommand),
    /// Pick a map.
    Pick(MapCommand),
    /// Choose the starting side for the latest pick.
    SelectSide(SideCommand),
    /// Start the negotiation.
    Start(SessionCommand),
    /// Reset the negotiation.
    Reset(SessionCommand),
    /// Liveness check; answered with `pong`.
    Ping,
}

impl InboundCommand {
    /// The session the command targets, if it targets one.
    pub const fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::Ban(cmd) | Self::Pick(cmd) => Some(cmd.session_id),
            Self::SelectSide(cmd) => Some(cmd.session_id),
            Self::Start(cmd) | Self::Reset(cmd) => Some(cmd.session_id),
            Self::Ping => None,
        }
    }
}

/// Decode a text frame into a command.
pub fn decode(frame: &str) -> Result<InboundCommand, ProtocolError> {
    let envelope: Envelope =
        serde_json::from_str(frame).map_err(|_parse_err| ProtocolError::Malformed)?;
    match envelope.kind.as_str() {
        "ban" => payload(envelope.data).map(InboundCommand::Ban),
        "pick" => payload(envelope.data).map(InboundCommand::Pick),
        "side-selection" => payload(envelope.data).map(InboundCommand::SelectSide),
        "start" => payload(envelope.data).map(InboundCommand::Start),
        "reset" => payload(envelope.data).map(InboundCommand::Reset),
        "ping" => Ok(InboundCommand::Ping),
        other => Err(ProtocolError::UnknownType(other.to_owned())),
    }
}

fn payload<T: for<'de> Deserialize<'de>>(data: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|e| ProtocolError::InvalidData(e.to_string()))
}

/// Body of every mutation broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationPayload {
    /// The session as persisted after the mutation.
    pub session: Session,
    /// The action the mutation created, for ban and pick.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// What the session expects next.
    pub next_action: NextAction,
    /// User who triggered the mutation over a room connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

/// Body of `room:join` and `room:leave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Room the observer joined or left.
    pub room_id: RoomId,
    /// User behind the connection.
    pub user_id: UserId,
    /// The connection that joined or left.
    pub connection_id: ConnectionId,
    /// Members in the room after the change.
    pub members: usize,
}

/// Body of `room:state`, sent directly to a newly registered observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomStatePayload {
    /// The room.
    pub room_id: RoomId,
    /// The room's active session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    /// What the active session expects next.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<NextAction>,
}

/// Body of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable reason.
    pub message: String,
    /// Stable machine-readable code.
    pub code: String,
}

/// Body of `pong`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongPayload {
    /// Always `"pong"`.
    pub message: String,
}

/// Every frame the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// A ban was accepted.
    #[serde(rename = "ban")]
    Ban(Box<MutationPayload>),
    /// A pick was accepted.
    #[serde(rename = "pick")]
    Pick(Box<MutationPayload>),
    /// A side was selected.
    #[serde(rename = "side-selection")]
    SideSelection(Box<MutationPayload>),
    /// The session was started.
    #[serde(rename = "start")]
    Start(Box<MutationPayload>),
    /// The session was reset.
    #[serde(rename = "reset")]
    Reset(Box<MutationPayload>),
    /// Another observer joined the room.
    #[serde(rename = "room:join")]
    RoomJoin(PresencePayload),
    /// An observer left the room.
    #[serde(rename = "room:leave")]
    RoomLeave(PresencePayload),
    /// Snapshot of the room for a new observer.
    #[serde(rename = "room:state")]
    RoomState(Box<RoomStatePayload>),
    /// A command was rejected.
    #[serde(rename = "error")]
    Error(ErrorPayload),
    /// Reply to `ping`.
    #[serde(rename = "pong")]
    Pong(PongPayload),
}

impl ServerMessage {
    /// Build an `error` frame.
    pub fn error(message: impl Into<String>, code: &str) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            code: String::from(code),
        })
    }

    /// Build a `pong` frame.
    pub fn pong() -> Self {
        Self::Pong(PongPayload {
            message: String::from("pong"),
        })
    }

    /// Build the `error` frame for a frame that failed to decode.
    pub fn protocol_error(err: &ProtocolError) -> Self {
        Self::error(err.to_string(), err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_ban_command() {
        let session_id = SessionId::new();
        let map_id = MapId::new();
        let frame = json!({
            "type": "ban",
            "data": { "session_id": session_id, "map_id": map_id, "team": "A" }
        })
        .to_string();

        let decoded = decode(&frame);
        assert_eq!(
            decoded,
            Ok(InboundCommand::Ban(MapCommand {
                session_id,
                map_id,
                team: String::from("A"),
            }))
        );
    }

    #[test]
    fn decodes_side_selection_and_ping() {
        let session_id = SessionId::new();
        let frame = json!({
            "type": "side-selection",
            "data": { "session_id": session_id, "team": "B", "side": "defence" }
        })
        .to_string();
        assert!(matches!(decode(&frame), Ok(InboundCommand::SelectSide(cmd)) if cmd.side == "defence"));
        assert_eq!(decode(r#"{"type":"ping"}"#), Ok(InboundCommand::Ping));
    }

    #[test]
    fn non_json_is_malformed() {
        let err = decode("not json");
        assert_eq!(err, Err(ProtocolError::Malformed));
        assert!(matches!(err, Err(e) if e.to_string() == "invalid message format"));
    }

    #[test]
    fn unknown_type_is_named() {
        let err = decode(r#"{"type":"veto:swap","data":{}}"#);
        assert!(
            matches!(&err, Err(e) if e.to_string() == "unknown message type: veto:swap"),
            "{err:?}"
        );
    }

    #[test]
    fn missing_fields_are_invalid_data() {
        let err = decode(r#"{"type":"pick","data":{"team":"A"}}"#);
        assert!(matches!(err, Err(ProtocolError::InvalidData(_))));
        assert_eq!(
            err.map_err(|e| e.code()).err(),
            Some(INVALID_MESSAGE_CODE)
        );
    }

    #[test]
    fn outbound_frames_use_type_and_data() {
        let frame = serde_json::to_value(ServerMessage::error("not your turn", "not_your_turn"));
        assert_eq!(
            frame.ok(),
            Some(json!({
                "type": "error",
                "data": { "message": "not your turn", "code": "not_your_turn" }
            }))
        );

        let pong = serde_json::to_value(ServerMessage::pong()).ok();
        assert_eq!(pong, Some(json!({ "type": "pong", "data": { "message": "pong" } })));
    }

    #[test]
    fn session_id_is_exposed_for_session_commands() {
        let session_id = SessionId::new();
        assert_eq!(
            InboundCommand::Start(SessionCommand { session_id }).session_id(),
            Some(session_id)
        );
        assert_eq!(InboundCommand::Ping.session_id(), None);
    }
}
