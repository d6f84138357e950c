//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in the veto service has a strongly-typed ID so a map ID can
//! never be passed where a session ID is expected. All IDs use UUID v7
//! (time-ordered) for efficient database indexing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a veto session (one negotiation).
    SessionId
}

define_id! {
    /// Unique identifier for a single ban or pick within a session.
    ActionId
}

define_id! {
    /// Unique identifier for a playable map.
    MapId
}

define_id! {
    /// Unique identifier for a map pool.
    MapPoolId
}

define_id! {
    /// Unique identifier for a game title owning maps and pools.
    GameId
}

define_id! {
    /// Unique identifier for a room grouping observers around a session.
    RoomId
}

define_id! {
    /// Unique identifier for a user.
    UserId
}

define_id! {
    /// Unique identifier for one live observer connection.
    ConnectionId
}
