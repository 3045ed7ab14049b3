//! `PostgreSQL` implementation of [`ScenarioRepository`].
//!
//! Schema (see `migrations/0001_scenarios.sql`):
//!
//! | Table | Purpose |
//! |-------|---------|
//! | `scenarios` | One row per scenario, including `current_version` |
//! | `scenario_items` | One row per (version, entity) pair |
//! | `currencies` | Currency code to ISO numeric code lookup |
//!
//! Appending a version locks the scenario row with `SELECT ... FOR UPDATE`,
//! so two appends to the same scenario cannot both read the same
//! `current_version`. Appends to different scenarios do not contend.

use async_trait::async_trait;
use portcon_types::{Scenario, ScenarioItem};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::error::DbError;
use crate::repository::{NewScenario, NewVersion, ScenarioRepository};

/// Scenario persistence on a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgScenarioRepository {
    pool: PgPool,
}

impl PgScenarioRepository {
    /// Create a repository that checks connections out of `pool`.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScenarioRepository for PgScenarioRepository {
    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_scenario(&self, scenario: &NewScenario<'_>) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;

        let taken: Option<(i64,)> =
            sqlx::query_as(r"SELECT scenario_id FROM scenarios WHERE scenario_name = $1")
                .bind(scenario.name)
                .fetch_optional(&mut *tx)
                .await?;
        if taken.is_some() {
            return Err(DbError::DuplicateName(scenario.name.to_owned()));
        }

        let iso_code: Option<(String,)> =
            sqlx::query_as(r"SELECT iso_numeric_code FROM currencies WHERE currency = $1")
                .bind(scenario.currency)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((iso_code,)) = iso_code else {
            return Err(DbError::UnknownCurrency(scenario.currency.to_owned()));
        };

        // A concurrent insert of the same name can slip in between the check
        // above and this statement; the unique constraint catches it.
        let inserted: Option<(i64,)> = sqlx::query_as(
            r"INSERT INTO scenarios (scenario_name, implementation_date, currency, created_by, created_on, modified_by, modified_on, current_version)
              VALUES ($1, $2, $3, $4, $5, $4, $5, 0)
              ON CONFLICT (scenario_name) DO NOTHING
              RETURNING scenario_id",
        )
        .bind(scenario.name)
        .bind(scenario.implementation_date)
        .bind(&iso_code)
        .bind(scenario.created_by)
        .bind(scenario.created_on)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((scenario_id,)) = inserted else {
            return Err(DbError::DuplicateName(scenario.name.to_owned()));
        };

        tx.commit().await?;

        tracing::info!(
            scenario_id,
            name = scenario.name,
            currency = iso_code.as_str(),
            "Inserted scenario"
        );

        Ok(scenario_id)
    }

    async fn find_scenario(&self, name: &str) -> Result<Option<Scenario>, DbError> {
        let row = sqlx::query_as::<_, ScenarioRow>(
            r"SELECT scenario_id, scenario_name, implementation_date, currency, created_by, created_on, modified_by, modified_on, current_version
              FROM scenarios
              WHERE scenario_name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Scenario::from))
    }

    async fn list_scenarios(&self) -> Result<Vec<Scenario>, DbError> {
        let rows = sqlx::query_as::<_, ScenarioRow>(
            r"SELECT scenario_id, scenario_name, implementation_date, currency, created_by, created_on, modified_by, modified_on, current_version
              FROM scenarios
              ORDER BY scenario_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Scenario::from).collect())
    }

    async fn current_version(&self, name: &str) -> Result<Option<i64>, DbError> {
        let row: Option<(i64,)> =
            sqlx::query_as(r"SELECT current_version FROM scenarios WHERE scenario_name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(version,)| version))
    }

    async fn version_items(
        &self,
        name: &str,
        version: i64,
    ) -> Result<Option<Vec<ScenarioItem>>, DbError> {
        if self.current_version(name).await?.is_none() {
            return Ok(None);
        }

        // Version 0 is resolved inside the statement so the pointer read and
        // the item read see the same snapshot.
        let rows = sqlx::query_as::<_, ScenarioItemRow>(
            r"SELECT i.scenario_item_id, i.scenario_version, i.entity_id, i.weight, i.created_by, i.created_on
              FROM scenario_items i
              INNER JOIN scenarios s ON s.scenario_id = i.scenario_id
              WHERE s.scenario_name = $1
                AND i.scenario_version = CASE WHEN $2::BIGINT = 0 THEN s.current_version ELSE $2::BIGINT END
              ORDER BY i.scenario_item_id",
        )
        .bind(name)
        .bind(version)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(rows.into_iter().map(ScenarioItem::from).collect()))
    }

    async fn append_version(&self, batch: &NewVersion<'_>) -> Result<i64, DbError> {
        batch.check_lengths()?;

        let mut tx = self.pool.begin().await?;

        let locked: Option<(i64, i64)> = sqlx::query_as(
            r"SELECT scenario_id, current_version
              FROM scenarios
              WHERE scenario_name = $1
              FOR UPDATE",
        )
        .bind(batch.name)
        .fetch_optional(&mut *tx)
        .await?;
        // Returning early drops `tx`, which rolls it back and releases the lock.
        let Some((scenario_id, current)) = locked else {
            return Err(DbError::ScenarioNotFound(batch.name.to_owned()));
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| DbError::VersionOverflow(batch.name.to_owned()))?;

        if !batch.entity_ids.is_empty() {
            sqlx::query(
                r"INSERT INTO scenario_items (scenario_id, scenario_version, entity_id, weight, created_by, created_on)
                  SELECT $1, $2, batch.entity_id, batch.weight, $5, $6
                  FROM UNNEST($3::BIGINT[], $4::NUMERIC[]) WITH ORDINALITY AS batch(entity_id, weight, position)
                  ORDER BY batch.position",
            )
            .bind(scenario_id)
            .bind(next)
            .bind(batch.entity_ids)
            .bind(batch.weights)
            .bind(batch.created_by)
            .bind(batch.created_on)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r"UPDATE scenarios
              SET current_version = $1, modified_by = $2, modified_on = $3
              WHERE scenario_id = $4",
        )
        .bind(next)
        .bind(batch.created_by)
        .bind(batch.created_on)
        .bind(scenario_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            scenario_id,
            version = next,
            items = batch.entity_ids.len(),
            "Appended scenario version"
        );

        Ok(next)
    }
}

/// A row from the `scenarios` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScenarioRow {
    /// Scenario ID.
    pub scenario_id: i64,
    /// Unique scenario name.
    pub scenario_name: String,
    /// Implementation date.
    pub implementation_date: chrono::DateTime<chrono::Utc>,
    /// ISO numeric currency code.
    pub currency: String,
    /// Creator.
    pub created_by: String,
    /// Creation timestamp.
    pub created_on: chrono::DateTime<chrono::Utc>,
    /// Last modifier.
    pub modified_by: String,
    /// Last modification timestamp.
    pub modified_on: chrono::DateTime<chrono::Utc>,
    /// Latest version number.
    pub current_version: i64,
}

impl From<ScenarioRow> for Scenario {
    fn from(row: ScenarioRow) -> Self {
        Self {
            scenario_id: row.scenario_id,
            scenario_name: row.scenario_name,
            implementation_date: row.implementation_date,
            currency: row.currency,
            created_by: row.created_by,
            created_on: row.created_on,
            modified_by: row.modified_by,
            modified_on: row.modified_on,
            current_version: row.current_version,
        }
    }
}

/// A row from the `scenario_items` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScenarioItemRow {
    /// Item ID.
    pub scenario_item_id: i64,
    /// Version number.
    pub scenario_version: i64,
    /// Weighted entity.
    pub entity_id: i64,
    /// Weight.
    pub weight: Decimal,
    /// Creator.
    pub created_by: String,
    /// Version timestamp.
    pub created_on: chrono::DateTime<chrono::Utc>,
}

impl From<ScenarioItemRow> for ScenarioItem {
    fn from(row: ScenarioItemRow) -> Self {
        Self {
            scenario_item_id: row.scenario_item_id,
            scenario_version: row.scenario_version,
            entity_id: row.entity_id,
            weight: row.weight,
            created_by: row.created_by,
            created_on: row.created_on,
        }
    }
}
