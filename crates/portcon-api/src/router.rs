//! Axum router construction for the scenario API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the scenario server.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /api/scenarios` -- list scenarios
/// - `POST /api/scenarios` -- create a scenario
/// - `GET /api/scenario?name=` -- optional lookup
/// - `GET /api/scenarios/{name}` -- single scenario
/// - `GET /api/scenarios/{name}/items` -- items of a version
/// - `POST /api/scenarios/{name}/versions` -- save a version
/// - `GET /api/scenarios/{name}/watch` -- wait for a newer version
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/scenarios",
            get(handlers::list_scenarios).post(handlers::create_scenario),
        )
        .route("/api/scenario", get(handlers::find_scenario))
        .route("/api/scenarios/{name}", get(handlers::get_scenario))
        .route("/api/scenarios/{name}/items", get(handlers::get_scenario_items))
        .route("/api/scenarios/{name}/versions", post(handlers::save_scenario))
        .route("/api/scenarios/{name}/watch", get(handlers::watch_scenario))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
