//! Error types for the persistence layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and also carries the repository-level outcomes (duplicate
//! name, unknown currency, missing scenario) that callers need to tell apart.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A scenario with this name already exists.
    #[error("scenario name already in use: {0}")]
    DuplicateName(String),

    /// The currency code has no entry in the currency table.
    #[error("unknown currency: {0}")]
    UnknownCurrency(String),

    /// No scenario has this name.
    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    /// A version batch had different numbers of entity IDs and weights.
    #[error("batch has {entity_ids} entity IDs but {weights} weights")]
    MismatchedBatch {
        /// Number of entity IDs supplied.
        entity_ids: usize,
        /// Number of weights supplied.
        weights: usize,
    },

    /// The scenario's version counter cannot be advanced.
    #[error("version counter exhausted for scenario: {0}")]
    VersionOverflow(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
