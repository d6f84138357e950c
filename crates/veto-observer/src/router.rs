//! Axum router construction for the veto API.
//!
//! Assembles the REST routes and the room WebSocket into a single
//! [`Router`] with CORS and HTTP tracing layers.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::AppState;

/// Build the complete router.
///
/// `cors_origin` is either `*` or a single exact origin. An origin that is
/// not a valid header value disables cross-origin access.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        // Sessions
        .route("/api/veto/sessions", post(handlers::create_session))
        .route("/api/veto/sessions/{id}", get(handlers::get_session))
        .route(
            "/api/veto/sessions/share/{token}",
            get(handlers::get_shared_session),
        )
        .route(
            "/api/veto/sessions/{id}/next-action",
            get(handlers::get_next_action),
        )
        .route("/api/veto/sessions/{id}/room", get(handlers::get_session_room))
        // Mutations
        .route("/api/veto/sessions/{id}/start", post(handlers::start_session))
        .route("/api/veto/sessions/{id}/ban", post(handlers::ban_map))
        .route("/api/veto/sessions/{id}/pick", post(handlers::pick_map))
        .route(
            "/api/veto/sessions/{id}/select-side",
            post(handlers::select_side),
        )
        .route("/api/veto/sessions/{id}/reset", post(handlers::reset_session))
        // Catalog
        .route("/api/map-pools/{id}", get(handlers::get_map_pool))
        .route("/api/games/{id}/map-pools", get(handlers::list_game_pools))
        // Rooms
        .route("/api/rooms", post(handlers::create_room))
        .route("/api/rooms/{id}", get(handlers::get_room))
        .route("/api/rooms/{id}/join", post(handlers::join_room))
        .route("/api/rooms/{id}/leave", post(handlers::leave_room))
        .route("/api/rooms/{id}/observers", get(handlers::list_observers))
        .route("/ws/rooms/{id}", get(handlers::room_socket))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(e) => {
            warn!(origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}
