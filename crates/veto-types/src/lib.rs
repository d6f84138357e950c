//! Shared type definitions for the map veto service.
//!
//! This crate is the single source of truth for all types used across the
//! workspace. Types defined here flow downstream to `TypeScript` via `ts-rs`
//! for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Formats, statuses, action kinds, teams and sides
//! - [`structs`] -- Sessions, actions, map pools, maps and rooms

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{ActionKind, ParseEnumError, SessionStatus, Side, Team, VetoFormat};
pub use ids::{ActionId, ConnectionId, GameId, MapId, MapPoolId, RoomId, SessionId, UserId};
pub use structs::{Action, GameMap, MAX_TIMER_SECONDS, MapPool, Room, Session};
