//! The persistence seam used by the scenario core.
//!
//! [`ScenarioRepository`] is implemented by
//! [`PgScenarioRepository`](crate::scenario_store::PgScenarioRepository) for
//! production and by
//! [`MemoryScenarioRepository`](crate::memory::MemoryScenarioRepository) for
//! tests and single-process deployments.
//!
//! Every method is one unit of work: writes inside a method are committed
//! together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portcon_types::{Scenario, ScenarioItem};
use rust_decimal::Decimal;

use crate::error::DbError;

/// Currencies available in a fresh database, as (code, ISO numeric code).
///
/// Must list exactly the rows seeded by `migrations/0001_scenarios.sql`; the
/// in-memory repository starts from this table and the migration seeds
/// `PostgreSQL` with the same pairs.
pub const DEFAULT_CURRENCIES: &[(&str, &str)] = &[
    ("USD", "840"),
    ("EUR", "978"),
    ("GBP", "826"),
    ("JPY", "392"),
    ("CHF", "756"),
    ("CAD", "124"),
    ("AUD", "036"),
];

/// A scenario about to be inserted.
#[derive(Debug, Clone, Copy)]
pub struct NewScenario<'a> {
    /// Unique scenario name.
    pub name: &'a str,
    /// Currency code, resolved through the currency table.
    pub currency: &'a str,
    /// Date the scenario takes effect.
    pub implementation_date: DateTime<Utc>,
    /// Acting user, recorded as both creator and modifier.
    pub created_by: &'a str,
    /// Timestamp recorded as both creation and modification time.
    pub created_on: DateTime<Utc>,
}

/// A batch of items to append as the next version of a scenario.
///
/// `entity_ids` and `weights` are parallel slices of equal length.
#[derive(Debug, Clone, Copy)]
pub struct NewVersion<'a> {
    /// Name of the scenario receiving the version.
    pub name: &'a str,
    /// Entity identifiers, one per item.
    pub entity_ids: &'a [i64],
    /// Weights, one per item.
    pub weights: &'a [Decimal],
    /// Acting user, recorded on the items and as the scenario modifier.
    pub created_by: &'a str,
    /// Shared timestamp for every item and the scenario's `modified_on`.
    pub created_on: DateTime<Utc>,
}

impl NewVersion<'_> {
    /// Reject batches whose slices differ in length.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::MismatchedBatch`] when the lengths differ.
    pub fn check_lengths(&self) -> Result<(), DbError> {
        if self.entity_ids.len() == self.weights.len() {
            Ok(())
        } else {
            Err(DbError::MismatchedBatch {
                entity_ids: self.entity_ids.len(),
                weights: self.weights.len(),
            })
        }
    }
}

/// Durable storage for scenarios and their versioned items.
#[async_trait]
pub trait ScenarioRepository: Send + Sync {
    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), DbError>;

    /// Insert a scenario with `current_version = 0` and return its ID.
    ///
    /// Fails with [`DbError::DuplicateName`] when the name is taken and
    /// [`DbError::UnknownCurrency`] when the currency does not resolve. The
    /// name check comes first.
    async fn insert_scenario(&self, scenario: &NewScenario<'_>) -> Result<i64, DbError>;

    /// Look up a scenario by name.
    async fn find_scenario(&self, name: &str) -> Result<Option<Scenario>, DbError>;

    /// All scenarios, ordered by ID.
    async fn list_scenarios(&self) -> Result<Vec<Scenario>, DbError>;

    /// The scenario's current version, or `None` when it does not exist.
    async fn current_version(&self, name: &str) -> Result<Option<i64>, DbError>;

    /// Items of one version ordered by item ID, or `None` when the scenario
    /// does not exist. `version == 0` selects the current version.
    async fn version_items(
        &self,
        name: &str,
        version: i64,
    ) -> Result<Option<Vec<ScenarioItem>>, DbError>;

    /// Append `batch` as version `current + 1` and return the new number.
    ///
    /// The item insert and the scenario's `current_version`, `modified_by`
    /// and `modified_on` update commit as one unit. Concurrent appends to
    /// the same scenario serialize; each observes the previous one's result.
    async fn append_version(&self, batch: &NewVersion<'_>) -> Result<i64, DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_batch_is_rejected() {
        let weights = [Decimal::ONE];
        let batch = NewVersion {
            name: "Core",
            entity_ids: &[1, 2],
            weights: &weights,
            created_by: "portcon",
            created_on: Utc::now(),
        };
        assert!(matches!(
            batch.check_lengths(),
            Err(DbError::MismatchedBatch {
                entity_ids: 2,
                weights: 1
            })
        ));
    }

    #[test]
    fn default_currencies_are_unique() {
        let mut codes: Vec<&str> = DEFAULT_CURRENCIES.iter().map(|(code, _)| *code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), DEFAULT_CURRENCIES.len());
    }

    #[test]
    fn default_currencies_match_migration_seed() {
        let migration = include_str!("../migrations/0001_scenarios.sql");
        let seeded = migration
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with("('"))
            .count();
        assert_eq!(seeded, DEFAULT_CURRENCIES.len());
        for (code, numeric) in DEFAULT_CURRENCIES {
            let row = format!("('{code}', '{numeric}')");
            assert!(migration.contains(&row), "{row} is not seeded by the migration");
        }
    }
}
