//! Real-time room layer and HTTP API for the map veto service.
//!
//! This crate provides:
//!
//! - **Room broadcast hub** ([`hub`]): one coordinator task owning room
//!   membership, fanning serialized frames out to every member and
//!   evicting members that cannot keep up
//! - **Connection adapter** ([`connection`]): a reader loop and a writer
//!   task per room WebSocket, the writer starting only once the
//!   `room:state` snapshot is queued
//! - **Bridge** ([`bridge`]): runs pipeline mutations and broadcasts each
//!   accepted one into the owning room exactly once
//! - **Wire protocol** ([`protocol`]): the `{type, data}` envelope, decoded
//!   into typed commands
//! - **REST endpoints** ([`handlers`]) for creating, querying and mutating
//!   sessions, browsing map pools and managing room membership
//!
//! # Ordering
//!
//! Register, unregister and broadcast requests share one FIFO intake, so an
//! observer sees every broadcast enqueued after its registration completed
//! and none enqueued before it, in the order they were enqueued.

pub mod bridge;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod protocol;
pub mod router;
pub mod server;
pub mod state;

pub use bridge::VetoBridge;
pub use connection::ConnectionSettings;
pub use error::ApiError;
pub use hub::{Hub, HubError, HubHandle, MemberInfo, Registration};
pub use protocol::{InboundCommand, ServerMessage};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
