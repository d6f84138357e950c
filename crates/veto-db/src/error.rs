//! Error types for the data layer.
//!
//! All store implementations report failures through [`StoreError`], which
//! wraps the underlying [`sqlx`] errors and adds the two conditions callers
//! must distinguish: a uniqueness conflict and undecodable persisted data.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A uniqueness constraint rejected the write, e.g. a second action for
    /// an already occupied step.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A persisted value could not be decoded into its domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Map unique-constraint violations to [`StoreError::Conflict`] and
    /// everything else to [`StoreError::Postgres`].
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(format!("{what}: {}", db.message()))
            }
            _ => Self::Postgres(err),
        }
    }
}
