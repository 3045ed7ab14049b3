//! Shared type definitions for the Portcon scenario service.
//!
//! Types defined here are the records handed between the persistence layer,
//! the scenario core, and the REST API. They flow downstream to `TypeScript`
//! via `ts-rs` for API clients.
//!
//! # Modules
//!
//! - [`scenario`] -- Scenario metadata and versioned scenario items

pub mod scenario;

pub use scenario::{Scenario, ScenarioItem};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::scenario::Scenario::export_all();
        let _ = crate::scenario::ScenarioItem::export_all();
    }
}
