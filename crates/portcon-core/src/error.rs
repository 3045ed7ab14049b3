//! Error taxonomy for scenario operations.
//!
//! Every failure surfaced by [`ScenarioStore`](crate::store::ScenarioStore)
//! is one of the variants below, so the transport layer can map each to its
//! own protocol-level response.

use portcon_db::DbError;

/// Errors returned by scenario operations.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// A scenario with this name already exists.
    #[error("a scenario named {0} already exists")]
    AlreadyExists(String),

    /// The named scenario does not exist.
    #[error("scenario {0} does not exist")]
    NotFound(String),

    /// The request was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A referenced lookup value did not resolve.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// No newer version appeared before the watch deadline.
    #[error("timed out waiting for scenario {name} to pass version {since}")]
    Timeout {
        /// Scenario being watched.
        name: String,
        /// Version the caller already had.
        since: i64,
    },

    /// The persistence layer failed.
    #[error("persistence failure: {0}")]
    Persistence(#[source] DbError),
}

impl ScenarioError {
    /// Short machine-readable name of the variant.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "already_exists",
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidReference(_) => "invalid_reference",
            Self::Timeout { .. } => "timeout",
            Self::Persistence(_) => "persistence_failure",
        }
    }
}

impl From<DbError> for ScenarioError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::DuplicateName(name) => Self::AlreadyExists(name),
            DbError::ScenarioNotFound(name) => Self::NotFound(name),
            DbError::UnknownCurrency(code) => {
                Self::InvalidReference(format!("currency {code} is not recognised"))
            }
            DbError::MismatchedBatch {
                entity_ids,
                weights,
            } => Self::InvalidArgument(format!(
                "{entity_ids} entity IDs were given with {weights} weights"
            )),
            other => Self::Persistence(other),
        }
    }
}
