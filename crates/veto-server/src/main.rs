//! Map veto service binary.
//!
//! Wires configuration, logging, storage, the negotiation pipeline, the
//! room hub and the HTTP API together and serves until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`VETO_CONFIG`, else `veto-config.yaml`, else defaults)
//! 2. Initialize structured logging (tracing)
//! 3. Open the storage backend (seeded memory store or `PostgreSQL`)
//! 4. Build the veto and room services, start the room hub, build the bridge
//! 5. Serve HTTP and WebSocket traffic with graceful shutdown
//! 6. Stop the hub, closing every observer queue

mod error;
mod seed;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use veto_core::{RoomService, VetoService};
use veto_core::config::{LogFormat, LoggingConfig, StorageBackend, VetoConfig};
use veto_db::{
    ActionStore, InMemoryStore, MapPoolStore, PgVetoStore, PostgresConfig, PostgresPool,
    RoomDirectory, RoomStore, SessionStore,
};
use veto_observer::{AppState, ConnectionSettings, Hub, ServerConfig, VetoBridge, start_server};

use crate::error::ServerError;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Configuration comes first so it can pick the log format.
    let config = VetoConfig::load()?;

    // 2. Structured logging.
    init_tracing(&config.logging);
    info!(
        host = %config.server.host,
        port = config.server.port,
        backend = ?config.storage.backend,
        "veto-server starting"
    );

    // 3. Storage, then everything above it.
    match config.storage.backend {
        StorageBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            let pools = seed::seed_memory(&store).await;
            info!(pools = pools.len(), "In-memory store ready");
            run(&config, store).await
        }
        StorageBackend::Postgres => {
            let url = config
                .storage
                .postgres_url
                .as_deref()
                .ok_or(ServerError::MissingDatabaseUrl)?;
            let pg_config =
                PostgresConfig::new(url).with_max_connections(config.storage.max_connections);
            let pool = PostgresPool::connect(&pg_config).await?;
            if config.storage.run_migrations {
                pool.run_migrations().await?;
            }
            let result = run(&config, Arc::new(PgVetoStore::new(&pool))).await;
            pool.close().await;
            result
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_env_err| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Build the service stack over `store` and serve until shutdown.
async fn run<S>(config: &VetoConfig, store: Arc<S>) -> Result<(), ServerError>
where
    S: SessionStore + ActionStore + MapPoolStore + RoomStore + 'static,
{
    // 4. Services, hub, bridge.
    let service = Arc::new(VetoService::from_store(&store));
    let room_service = Arc::new(RoomService::from_store(&store));
    let directory: Arc<dyn RoomDirectory> = store;
    let hub = Hub::start();
    let bridge = Arc::new(VetoBridge::new(service, directory, hub.handle()));
    let settings = ConnectionSettings::from_config(&config.hub);
    let state = Arc::new(AppState::new(bridge, room_service, settings));
    info!(
        outbound_buffer = settings.outbound_buffer,
        ping_interval_secs = config.hub.ping_interval_secs,
        pong_timeout_secs = config.hub.pong_timeout_secs,
        "Room hub started"
    );

    // 5. Serve.
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        cors_origin: config.server.cors_origin.clone(),
    };
    let served = start_server(&server_config, state, shutdown_signal()).await;

    // 6. The hub outlives the listener so in-flight broadcasts drain.
    hub.stop().await;
    info!("veto-server shutdown complete");
    served.map_err(ServerError::from)
}

/// Resolves on Ctrl-C. If the handler cannot be installed the server runs
/// until killed.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}
