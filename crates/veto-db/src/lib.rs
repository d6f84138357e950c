//! Data layer for the map veto service.
//!
//! The negotiation pipeline and the room bridge depend only on the async
//! contracts in [`contracts`]. Two implementations are provided:
//!
//! ```text
//! VetoService / VetoBridge
//!     |
//!     +-- Arc<dyn SessionStore / ActionStore / MapPoolStore / RoomStore>
//!           |
//!           +-- InMemoryStore   (single RwLock, default backend, tests)
//!           +-- PgVetoStore     (PostgreSQL via sqlx)
//! ```
//!
//! # Modules
//!
//! - [`contracts`] -- Storage traits consumed by the core
//! - [`memory`] -- In-process implementation with seeding helpers
//! - [`postgres`] -- `PostgreSQL` connection pool, configuration and store handle
//! - [`session_store`] -- `veto_sessions` persistence
//! - [`action_store`] -- `veto_actions` persistence
//! - [`catalog_store`] -- Map pools and rooms
//! - [`error`] -- Shared error types

pub mod action_store;
pub mod catalog_store;
pub mod contracts;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod session_store;

// Re-export primary types for convenience.
pub use action_store::ActionRow;
pub use catalog_store::{MapPoolRow, PoolMapRow, RoomRow};
pub use contracts::{ActionStore, MapPoolStore, RoomDirectory, RoomStore, SessionStore};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::{PgVetoStore, PostgresConfig, PostgresPool};
pub use session_store::SessionRow;
