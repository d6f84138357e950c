//! Shared application state for the HTTP and WebSocket handlers.

use std::sync::Arc;

use veto_core::{RoomService, VetoService};

use crate::bridge::VetoBridge;
use crate::connection::ConnectionSettings;
use crate::hub::HubHandle;

/// State injected into every handler through Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pipeline front-end that broadcasts after each accepted mutation.
    pub bridge: Arc<VetoBridge>,
    /// Room creation and membership.
    pub rooms: Arc<RoomService>,
    /// Limits applied to room connections.
    pub connection: ConnectionSettings,
}

impl AppState {
    /// Bundle the bridge, the room service and connection settings.
    pub const fn new(
        bridge: Arc<VetoBridge>,
        rooms: Arc<RoomService>,
        connection: ConnectionSettings,
    ) -> Self {
        Self {
            bridge,
            rooms,
            connection,
        }
    }

    /// The negotiation pipeline.
    pub fn service(&self) -> &VetoService {
        self.bridge.service()
    }

    /// The room hub.
    pub fn hub(&self) -> &HubHandle {
        self.bridge.hub()
    }
}
