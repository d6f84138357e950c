//! Error taxonomy for the negotiation pipeline.
//!
//! Every failure maps to a stable snake_case [`VetoError::code`] and to one
//! [`ErrorCategory`], which transports translate into their own status
//! conventions.

use veto_db::StoreError;

/// Coarse failure classes shared by every transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A session, pool, room or map does not exist.
    NotFound,
    /// The session's state forbids the request, or the request is malformed.
    InvalidState,
    /// Wrong team or wrong action kind for the current step.
    TurnViolation,
    /// The map was already banned or picked.
    Conflict,
    /// The caller may not act on this room or session.
    Unauthorized,
    /// Storage or other infrastructure failure.
    Internal,
}

/// Failures surfaced by [`crate::VetoService`].
#[derive(Debug, thiserror::Error)]
pub enum VetoError {
    /// No session with the given ID or share token.
    #[error("session not found")]
    SessionNotFound,

    /// The session's map pool does not exist.
    #[error("map pool not found")]
    MapPoolNotFound,

    /// The map is not a member of the session's pool.
    #[error("map not found")]
    MapNotFound,

    /// Start requested on a session that already left `not_started`.
    #[error("session is already started")]
    AlreadyStarted,

    /// The session is finished or cancelled.
    #[error("session is already finished")]
    AlreadyFinished,

    /// The request is not meaningful in the session's current shape.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// The map was already banned or picked.
    #[error("map is already banned or picked")]
    MapUnavailable,

    /// Wrong team, wrong kind for the step, or a side selection is pending.
    #[error("not your turn")]
    NotYourTurn,

    /// The caller is not a participant of the room.
    #[error("not authorized")]
    Unauthorized,

    /// No room with the given ID, or none owning the session.
    #[error("room not found")]
    RoomNotFound,

    /// The user has already joined the room.
    #[error("user is already in the room")]
    AlreadyInRoom,

    /// Another room already follows the session.
    #[error("session already belongs to a room")]
    SessionInRoom,

    /// Session creation input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl VetoError {
    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "session_not_found",
            Self::MapPoolNotFound => "map_pool_not_found",
            Self::MapNotFound => "map_not_found",
            Self::AlreadyStarted => "already_started",
            Self::AlreadyFinished => "already_finished",
            Self::InvalidAction(_) => "invalid_action",
            Self::MapUnavailable => "map_unavailable",
            Self::NotYourTurn => "not_your_turn",
            Self::Unauthorized => "unauthorized",
            Self::RoomNotFound => "room_not_found",
            Self::AlreadyInRoom => "already_in_room",
            Self::SessionInRoom => "session_in_room",
            Self::Validation(_) => "validation_failed",
            Self::Storage(_) => "storage_error",
        }
    }

    /// The failure class for transport mapping.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SessionNotFound
            | Self::MapPoolNotFound
            | Self::MapNotFound
            | Self::RoomNotFound => ErrorCategory::NotFound,
            Self::AlreadyStarted
            | Self::AlreadyFinished
            | Self::InvalidAction(_)
            | Self::Validation(_) => ErrorCategory::InvalidState,
            Self::NotYourTurn => ErrorCategory::TurnViolation,
            Self::MapUnavailable | Self::AlreadyInRoom | Self::SessionInRoom => {
                ErrorCategory::Conflict
            }
            Self::Unauthorized => ErrorCategory::Unauthorized,
            Self::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Convert a failed action append: a uniqueness conflict means another
    /// writer already took the step.
    pub(crate) fn from_append(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => Self::NotYourTurn,
            other => Self::Storage(other),
        }
    }
}
