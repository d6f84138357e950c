//! Error types for the veto server binary.
//!
//! [`ServerError`] wraps every failure mode of startup and serving so
//! `main` can propagate with `?`.

use veto_core::ConfigError;
use veto_db::StoreError;

/// Top-level error for the veto server binary.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The `postgres` backend was selected without a connection string.
    #[error("storage.postgres_url (or DATABASE_URL) is required for the postgres backend")]
    MissingDatabaseUrl,

    /// Connecting to or migrating the database failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// The HTTP listener failed to bind or serve.
    #[error("http error: {source}")]
    Http {
        /// The underlying listener error.
        #[from]
        source: veto_observer::ServerError,
    },
}
