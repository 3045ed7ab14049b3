//! Persistence layer for the Portcon scenario service.
//!
//! The scenario core talks to storage only through the
//! [`ScenarioRepository`] trait. Two implementations are provided:
//!
//! ```text
//! ScenarioStore (portcon-core)
//!     |
//!     +-- ScenarioRepository
//!         |-- PgScenarioRepository      (PostgreSQL, pooled connections)
//!         +-- MemoryScenarioRepository  (process memory, tests)
//! ```
//!
//! # Modules
//!
//! - [`repository`] -- The repository trait and its input records
//! - [`scenario_store`] -- `PostgreSQL` implementation
//! - [`memory`] -- In-memory implementation
//! - [`postgres`] -- `PostgreSQL` connection pool and migrations
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod scenario_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryScenarioRepository;
pub use postgres::{PostgresConfig, PostgresPool};
pub use repository::{DEFAULT_CURRENCIES, NewScenario, NewVersion, ScenarioRepository};
pub use scenario_store::{PgScenarioRepository, ScenarioItemRow, ScenarioRow};
