//! REST API server for the Portcon scenario service.
//!
//! Exposes the scenario store over JSON HTTP endpoints, including a
//! long-poll endpoint that blocks until a scenario gains a newer version.
//!
//! # Architecture
//!
//! ```text
//! HTTP client --> Router (CORS, tracing) --> handlers --> ScenarioStore
//!                                                           |
//!                                       ScenarioRepository -+- VersionWatcher
//! ```
//!
//! # Modules
//!
//! - [`router`] -- Route table and middleware
//! - [`handlers`] -- Endpoint handlers and request/response bodies
//! - [`server`] -- Listener lifecycle and graceful shutdown
//! - [`state`] -- Shared handler state
//! - [`error`] -- HTTP error mapping

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
