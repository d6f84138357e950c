//! Negotiation mutation pipeline for the map veto service.
//!
//! [`VetoService`] validates and applies the five negotiation mutations
//! (start, ban, pick, side selection, reset) plus session creation, using
//! the pure rules in `veto-rules` and the storage contracts in `veto-db`.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `veto-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`VetoError`] and its [`ErrorCategory`] taxonomy.
//! - [`locks`] -- Per-session async locks serializing mutations.
//! - [`rooms`] -- [`RoomService`]: room creation, joining and leaving.
//! - [`service`] -- [`VetoService`] and its inputs and outputs.

pub mod config;
pub mod error;
pub mod locks;
pub mod rooms;
pub mod service;

pub use config::{ConfigError, VetoConfig};
pub use error::{ErrorCategory, VetoError};
pub use rooms::{NewRoom, RoomService};
pub use service::{MutationOutcome, NewSession, VetoService, parse_side, parse_team};
