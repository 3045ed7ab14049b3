//! In-memory implementation of [`ScenarioRepository`].
//!
//! Backs the test suites and the `memory` database backend. All tables live
//! behind one async mutex that is held for the whole of each operation, so
//! every operation is atomic and appends serialize. Nothing survives a
//! restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use portcon_types::scenario::CURRENT_VERSION;
use portcon_types::{Scenario, ScenarioItem};
use tokio::sync::Mutex;

use crate::error::DbError;
use crate::repository::{DEFAULT_CURRENCIES, NewScenario, NewVersion, ScenarioRepository};

/// Scenario persistence held in process memory.
#[derive(Debug)]
pub struct MemoryScenarioRepository {
    tables: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    /// Currency code to ISO numeric code.
    currencies: BTreeMap<String, String>,
    /// Scenarios keyed by name.
    scenarios: BTreeMap<String, Scenario>,
    /// Items keyed by scenario ID, in insertion order.
    items: BTreeMap<i64, Vec<ScenarioItem>>,
    last_scenario_id: i64,
    last_item_id: i64,
}

impl MemoryScenarioRepository {
    /// Create an empty repository with the default currency table.
    pub fn new() -> Self {
        let currencies = DEFAULT_CURRENCIES
            .iter()
            .map(|(code, iso)| ((*code).to_owned(), (*iso).to_owned()))
            .collect();
        Self {
            tables: Mutex::new(Tables {
                currencies,
                ..Tables::default()
            }),
        }
    }

    /// Add (or replace) a currency mapping.
    #[must_use]
    pub fn with_currency(mut self, code: &str, iso_numeric_code: &str) -> Self {
        self.tables
            .get_mut()
            .currencies
            .insert(code.to_owned(), iso_numeric_code.to_owned());
        self
    }

    /// Total number of item rows across all scenarios.
    pub async fn item_count(&self) -> usize {
        self.tables.lock().await.items.values().map(Vec::len).sum()
    }
}

impl Default for MemoryScenarioRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScenarioRepository for MemoryScenarioRepository {
    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }

    async fn insert_scenario(&self, scenario: &NewScenario<'_>) -> Result<i64, DbError> {
        let mut tables = self.tables.lock().await;

        if tables.scenarios.contains_key(scenario.name) {
            return Err(DbError::DuplicateName(scenario.name.to_owned()));
        }
        let iso_code = tables
            .currencies
            .get(scenario.currency)
            .cloned()
            .ok_or_else(|| DbError::UnknownCurrency(scenario.currency.to_owned()))?;

        let scenario_id = tables.last_scenario_id.saturating_add(1);
        tables.last_scenario_id = scenario_id;
        tables.scenarios.insert(
            scenario.name.to_owned(),
            Scenario {
                scenario_id,
                scenario_name: scenario.name.to_owned(),
                implementation_date: scenario.implementation_date,
                currency: iso_code,
                created_by: scenario.created_by.to_owned(),
                created_on: scenario.created_on,
                modified_by: scenario.created_by.to_owned(),
                modified_on: scenario.created_on,
                current_version: 0,
            },
        );

        tracing::info!(scenario_id, name = scenario.name, "Inserted scenario");
        Ok(scenario_id)
    }

    async fn find_scenario(&self, name: &str) -> Result<Option<Scenario>, DbError> {
        Ok(self.tables.lock().await.scenarios.get(name).cloned())
    }

    async fn list_scenarios(&self) -> Result<Vec<Scenario>, DbError> {
        let tables = self.tables.lock().await;
        let mut scenarios: Vec<Scenario> = tables.scenarios.values().cloned().collect();
        scenarios.sort_by_key(|s| s.scenario_id);
        Ok(scenarios)
    }

    async fn current_version(&self, name: &str) -> Result<Option<i64>, DbError> {
        Ok(self
            .tables
            .lock()
            .await
            .scenarios
            .get(name)
            .map(|s| s.current_version))
    }

    async fn version_items(
        &self,
        name: &str,
        version: i64,
    ) -> Result<Option<Vec<ScenarioItem>>, DbError> {
        let tables = self.tables.lock().await;
        let Some(scenario) = tables.scenarios.get(name) else {
            return Ok(None);
        };
        let wanted = if version == CURRENT_VERSION {
            scenario.current_version
        } else {
            version
        };

        let items = tables
            .items
            .get(&scenario.scenario_id)
            .map(|rows| {
                rows.iter()
                    .filter(|item| item.scenario_version == wanted)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(items))
    }

    async fn append_version(&self, batch: &NewVersion<'_>) -> Result<i64, DbError> {
        batch.check_lengths()?;

        let mut tables = self.tables.lock().await;
        let Tables {
            scenarios,
            items,
            last_item_id,
            ..
        } = &mut *tables;

        let scenario = scenarios
            .get_mut(batch.name)
            .ok_or_else(|| DbError::ScenarioNotFound(batch.name.to_owned()))?;
        let next = scenario
            .current_version
            .checked_add(1)
            .ok_or_else(|| DbError::VersionOverflow(batch.name.to_owned()))?;

        let rows = items.entry(scenario.scenario_id).or_default();
        for (entity_id, weight) in batch.entity_ids.iter().zip(batch.weights) {
            *last_item_id = last_item_id.saturating_add(1);
            rows.push(ScenarioItem {
                scenario_item_id: *last_item_id,
                scenario_version: next,
                entity_id: *entity_id,
                weight: *weight,
                created_by: batch.created_by.to_owned(),
                created_on: batch.created_on,
            });
        }

        scenario.current_version = next;
        scenario.modified_by = batch.created_by.to_owned();
        scenario.modified_on = batch.created_on;

        tracing::debug!(
            scenario_id = scenario.scenario_id,
            version = next,
            items = batch.entity_ids.len(),
            "Appended scenario version"
        );

        Ok(next)
    }
}
