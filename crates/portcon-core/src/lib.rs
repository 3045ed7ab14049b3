//! Scenario core for the Portcon scenario service.
//!
//! Owns the versioned scenario store and the version watcher that lets
//! clients long-poll for new versions. Persistence is reached only through
//! [`portcon_db::ScenarioRepository`], so the same core runs over
//! `PostgreSQL` in production and process memory in tests.
//!
//! ```text
//! save_scenario --> ScenarioRepository::append_version --> VersionWatcher::publish
//!                                                               |
//! watch_scenario --> current_version --> observe --> wait <-----+
//! ```
//!
//! # Modules
//!
//! - [`store`] -- Scenario operations and argument validation
//! - [`watcher`] -- Latest-version registry and blocking waits
//! - [`config`] -- YAML service configuration with env overrides
//! - [`error`] -- Scenario error taxonomy

pub mod config;
pub mod error;
pub mod store;
pub mod watcher;

pub use config::PortconConfig;
pub use error::ScenarioError;
pub use store::ScenarioStore;
pub use watcher::VersionWatcher;
