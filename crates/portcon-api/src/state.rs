//! Shared application state for the scenario API server.

use std::sync::Arc;

use portcon_core::ScenarioStore;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The scenario store all endpoints operate on.
    pub store: Arc<ScenarioStore>,
}

impl AppState {
    /// Wrap a store for use as router state.
    pub const fn new(store: Arc<ScenarioStore>) -> Self {
        Self { store }
    }
}
