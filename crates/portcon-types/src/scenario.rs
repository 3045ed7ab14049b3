//! Scenario records.
//!
//! A [`Scenario`] is a named portfolio-construction configuration. Its
//! contents live in append-only versions: each save writes a fresh set of
//! [`ScenarioItem`] rows under the next version number and never touches
//! earlier versions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Version number meaning "whatever is current" in item lookups.
pub const CURRENT_VERSION: i64 = 0;

/// Metadata for a named scenario.
///
/// `current_version` is `0` until the first save. After every save the
/// items of `current_version` carry a `created_on` equal to `modified_on`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Scenario {
    /// Database identifier.
    pub scenario_id: i64,
    /// Unique scenario name.
    pub scenario_name: String,
    /// Date the scenario's portfolio is meant to take effect.
    pub implementation_date: DateTime<Utc>,
    /// ISO 4217 numeric code of the scenario currency.
    pub currency: String,
    /// User that created the scenario.
    pub created_by: String,
    /// Creation timestamp.
    pub created_on: DateTime<Utc>,
    /// User that wrote the latest version.
    pub modified_by: String,
    /// Timestamp of the latest version.
    pub modified_on: DateTime<Utc>,
    /// Latest version number, `0` when nothing has been saved yet.
    pub current_version: i64,
}

impl Scenario {
    /// Whether at least one version has been saved.
    pub const fn has_versions(&self) -> bool {
        self.current_version > CURRENT_VERSION
    }
}

/// One weighted entity within a scenario version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScenarioItem {
    /// Database identifier; increases with insertion order.
    pub scenario_item_id: i64,
    /// Version this row belongs to.
    pub scenario_version: i64,
    /// Identifier of the weighted entity.
    pub entity_id: i64,
    /// Weight, stored with two decimal places.
    #[ts(as = "String")]
    pub weight: Decimal,
    /// User that saved the version.
    pub created_by: String,
    /// Shared timestamp of every row in the version.
    pub created_on: DateTime<Utc>,
}
