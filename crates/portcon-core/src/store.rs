//! Versioned scenario store.
//!
//! [`ScenarioStore`] is the single entry point for scenario operations. It
//! validates arguments, delegates persistence to an injected
//! [`ScenarioRepository`], and publishes every committed version to the
//! injected [`VersionWatcher`] before the save returns.
//!
//! Saves to the same scenario pass through a per-name gate that is held
//! across the repository append and the publish, so publishes for one
//! scenario reach the watcher in version order. Saves to different
//! scenarios do not contend on the gate. A gate is dropped from the map by
//! the last save holding it, so names that never resolve to a scenario
//! leave nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, SubsecRound, Utc};
use portcon_db::{NewScenario, NewVersion, ScenarioRepository};
use portcon_types::{Scenario, ScenarioItem};
use rust_decimal::Decimal;

use crate::error::ScenarioError;
use crate::watcher::VersionWatcher;

/// Longest scenario name the `scenarios` table accepts.
pub const MAX_NAME_LEN: usize = 60;

/// Scenario operations over a repository and a version watcher.
pub struct ScenarioStore {
    repository: Arc<dyn ScenarioRepository>,
    watcher: Arc<VersionWatcher>,
    acting_user: String,
    save_gates: Mutex<HashMap<String, SaveGate>>,
}

type SaveGate = Arc<tokio::sync::Mutex<()>>;

impl std::fmt::Debug for ScenarioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioStore")
            .field("acting_user", &self.acting_user)
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

impl ScenarioStore {
    /// Build a store. Rows written by this store are attributed to
    /// `acting_user`.
    pub fn new(
        repository: Arc<dyn ScenarioRepository>,
        watcher: Arc<VersionWatcher>,
        acting_user: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            watcher,
            acting_user: acting_user.into(),
            save_gates: Mutex::new(HashMap::new()),
        }
    }

    /// The watcher this store publishes to.
    pub const fn watcher(&self) -> &Arc<VersionWatcher> {
        &self.watcher
    }

    /// Check that the repository is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Persistence`] if the repository cannot be
    /// reached.
    pub async fn ping(&self) -> Result<(), ScenarioError> {
        Ok(self.repository.ping().await?)
    }

    /// Create a scenario with no versions and return its identifier.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidArgument`] if the name is empty or too long.
    /// - [`ScenarioError::AlreadyExists`] if the name is taken.
    /// - [`ScenarioError::InvalidReference`] if the currency is unknown.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn create_scenario(
        &self,
        name: &str,
        currency: &str,
        implementation_date: DateTime<Utc>,
    ) -> Result<i64, ScenarioError> {
        validate_name(name)?;

        let now = now();
        let scenario_id = self
            .repository
            .insert_scenario(&NewScenario {
                name,
                currency,
                implementation_date: implementation_date.trunc_subsecs(6),
                created_by: &self.acting_user,
                created_on: now,
            })
            .await?;

        tracing::info!(scenario_id, name, currency, "Scenario created");
        Ok(scenario_id)
    }

    /// Fetch one scenario by name.
    ///
    /// An empty name is treated as "no filter" and yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::NotFound`] if no scenario has this name.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn get_scenario(&self, name: &str) -> Result<Option<Scenario>, ScenarioError> {
        if name.is_empty() {
            return Ok(None);
        }
        self.repository
            .find_scenario(name)
            .await?
            .map(Some)
            .ok_or_else(|| ScenarioError::NotFound(name.to_owned()))
    }

    /// All scenarios, ordered by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Persistence`] on repository failure.
    pub async fn get_all_scenarios(&self) -> Result<Vec<Scenario>, ScenarioError> {
        Ok(self.repository.list_scenarios().await?)
    }

    /// Items of one version, ordered by item identifier.
    ///
    /// `version == 0` means the scenario's current version. A version that
    /// was never written yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidArgument`] if `version` is negative.
    /// - [`ScenarioError::NotFound`] if the scenario does not exist.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn get_scenario_items(
        &self,
        name: &str,
        version: i64,
    ) -> Result<Vec<ScenarioItem>, ScenarioError> {
        if version < 0 {
            return Err(ScenarioError::InvalidArgument(format!(
                "version must not be negative, got {version}"
            )));
        }
        let items = self
            .repository
            .version_items(name, version)
            .await?
            .ok_or_else(|| ScenarioError::NotFound(name.to_owned()))?;

        tracing::debug!(name, version, items = items.len(), "Read scenario items");
        Ok(items)
    }

    /// Write a new version of `name` and return its number.
    ///
    /// `entity_ids[i]` is paired with `weights[i]`. Weights are stored with
    /// two decimal places. The new version is published to the watcher
    /// before this returns.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidArgument`] if the lengths differ or a
    ///   weight is not finite or not below 1000 in magnitude. Nothing is
    ///   written in that case.
    /// - [`ScenarioError::NotFound`] if the scenario does not exist.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn save_scenario(
        &self,
        name: &str,
        entity_ids: &[i64],
        weights: &[f64],
    ) -> Result<i64, ScenarioError> {
        if entity_ids.len() != weights.len() {
            return Err(ScenarioError::InvalidArgument(format!(
                "{} entity IDs were given with {} weights",
                entity_ids.len(),
                weights.len()
            )));
        }
        let weights = to_decimal_weights(weights)?;

        let gate = self.acquire_gate(name);
        let held = gate.lock().await;

        let appended = self
            .repository
            .append_version(&NewVersion {
                name,
                entity_ids,
                weights: &weights,
                created_by: &self.acting_user,
                created_on: now(),
            })
            .await;
        if let Ok(version) = appended {
            self.watcher.publish(name, version);
        }
        drop(held);
        self.release_gate(name, gate);

        let version = appended?;

        tracing::info!(name, version, items = entity_ids.len(), "Scenario saved");
        Ok(version)
    }

    /// Block until `name` has a version newer than `since_version`.
    ///
    /// `since_version == 0` waits for any version newer than the current
    /// one. Returns at once when the current version is already newer.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::InvalidArgument`] if `since_version` is negative.
    /// - [`ScenarioError::NotFound`] if the scenario does not exist.
    /// - [`ScenarioError::Timeout`] if nothing newer appears in time.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn watch_scenario(&self, name: &str, since_version: i64) -> Result<i64, ScenarioError> {
        if since_version < 0 {
            return Err(ScenarioError::InvalidArgument(format!(
                "since version must not be negative, got {since_version}"
            )));
        }

        let current = self.current_version(name).await?;
        self.watcher.observe(name, current);

        tracing::debug!(name, since = since_version, current, "Watching scenario");
        self.watcher.wait(name, since_version, current).await
    }

    /// Current version of `name`, read fresh from the repository.
    ///
    /// # Errors
    ///
    /// - [`ScenarioError::NotFound`] if the scenario does not exist.
    /// - [`ScenarioError::Persistence`] on repository failure.
    pub async fn current_version(&self, name: &str) -> Result<i64, ScenarioError> {
        self.repository
            .current_version(name)
            .await?
            .ok_or_else(|| ScenarioError::NotFound(name.to_owned()))
    }

    fn acquire_gate(&self, name: &str) -> SaveGate {
        let mut gates = self.save_gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(name.to_owned()).or_default())
    }

    /// Hand back a gate from [`acquire_gate`](Self::acquire_gate), removing
    /// it from the map when no other save still holds a clone.
    fn release_gate(&self, name: &str, gate: SaveGate) {
        let mut gates = self.save_gates.lock().unwrap_or_else(PoisonError::into_inner);
        drop(gate);
        if gates.get(name).is_some_and(|entry| Arc::strong_count(entry) == 1) {
            gates.remove(name);
        }
    }

    /// Number of per-scenario save gates currently tracked.
    #[cfg(test)]
    fn tracked_gates(&self) -> usize {
        self.save_gates.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Timestamp for a write, at the precision `PostgreSQL` stores.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn validate_name(name: &str) -> Result<(), ScenarioError> {
    if name.is_empty() {
        return Err(ScenarioError::InvalidArgument(String::from(
            "scenario name must not be empty",
        )));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ScenarioError::InvalidArgument(format!(
            "scenario name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Convert caller weights to two-place decimals that fit `NUMERIC(5,2)`.
fn to_decimal_weights(weights: &[f64]) -> Result<Vec<Decimal>, ScenarioError> {
    weights
        .iter()
        .enumerate()
        .map(|(index, &weight)| {
            if !weight.is_finite() {
                return Err(ScenarioError::InvalidArgument(format!(
                    "weight at index {index} is not a finite number"
                )));
            }
            // Finite values too large for a decimal are out of range too.
            let mut decimal = Decimal::from_f64_retain(weight)
                .ok_or_else(|| {
                    ScenarioError::InvalidArgument(format!(
                        "weight at index {index} must be below 1000 in magnitude, got {weight}"
                    ))
                })?
                .round_dp(2);
            decimal.rescale(2);
            if decimal.abs() >= Decimal::ONE_THOUSAND {
                return Err(ScenarioError::InvalidArgument(format!(
                    "weight at index {index} must be below 1000 in magnitude, got {decimal}"
                )));
            }
            Ok(decimal)
        })
        .collect()
}
