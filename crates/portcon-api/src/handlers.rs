//! REST API endpoint handlers for the scenario server.
//!
//! Every handler delegates to the shared
//! [`ScenarioStore`](portcon_core::ScenarioStore) and maps failures through
//! [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and repository reachability |
//! | `GET` | `/api/scenarios` | List all scenarios |
//! | `POST` | `/api/scenarios` | Create a scenario |
//! | `GET` | `/api/scenario?name=` | Optional lookup (`null` without a name) |
//! | `GET` | `/api/scenarios/{name}` | Get one scenario |
//! | `GET` | `/api/scenarios/{name}/items` | Items of a version (`?version=N`) |
//! | `POST` | `/api/scenarios/{name}/versions` | Save a new version |
//! | `GET` | `/api/scenarios/{name}/watch` | Long-poll for a newer version (`?since=N`) |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use portcon_core::ScenarioError;
use portcon_types::{Scenario, ScenarioItem};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// Body of `POST /api/scenarios`.
#[derive(Debug, Deserialize)]
pub struct CreateScenarioRequest {
    /// Unique scenario name.
    pub name: String,
    /// Currency code, e.g. `USD`.
    pub currency: String,
    /// Date the scenario takes effect.
    pub implementation_date: DateTime<Utc>,
}

/// Response of `POST /api/scenarios`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateScenarioResponse {
    /// Identifier of the new scenario.
    pub scenario_id: i64,
}

/// Body of `POST /api/scenarios/{name}/versions`.
///
/// `entity_ids[i]` is paired with `weights[i]`.
#[derive(Debug, Deserialize)]
pub struct SaveScenarioRequest {
    /// Entities in the new version.
    #[serde(default)]
    pub entity_ids: Vec<i64>,
    /// Weight of each entity.
    #[serde(default)]
    pub weights: Vec<f64>,
}

/// A version number, returned by saves and watches.
#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    /// The version number.
    pub version: i64,
}

/// Response of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the response is a success.
    pub status: String,
}

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/scenario`.
#[derive(Debug, Deserialize)]
pub struct ScenarioQuery {
    /// Scenario name; missing or empty means no filter.
    #[serde(default)]
    pub name: String,
}

/// Query parameters for `GET /api/scenarios/{name}/items`.
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    /// Version to read; `0` (the default) means the current version.
    #[serde(default)]
    pub version: i64,
}

/// Query parameters for `GET /api/scenarios/{name}/watch`.
#[derive(Debug, Deserialize)]
pub struct WatchQuery {
    /// Version the caller already has; `0` (the default) means "current".
    #[serde(default)]
    pub since: i64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Report liveness once the repository answers.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    state.store.ping().await?;
    Ok(Json(HealthResponse {
        status: String::from("ok"),
    }))
}

/// List every scenario, ordered by identifier.
pub async fn list_scenarios(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Scenario>>, ApiError> {
    Ok(Json(state.store.get_all_scenarios().await?))
}

/// Create a scenario.
pub async fn create_scenario(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateScenarioRequest>,
) -> Result<(StatusCode, Json<CreateScenarioResponse>), ApiError> {
    let scenario_id = state
        .store
        .create_scenario(&request.name, &request.currency, request.implementation_date)
        .await?;
    Ok((StatusCode::CREATED, Json(CreateScenarioResponse { scenario_id })))
}

/// Look a scenario up by an optional name filter.
///
/// Responds with `null` when no name is given.
pub async fn find_scenario(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScenarioQuery>,
) -> Result<Json<Option<Scenario>>, ApiError> {
    Ok(Json(state.store.get_scenario(&params.name).await?))
}

/// Get one scenario by name.
pub async fn get_scenario(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Scenario>, ApiError> {
    let scenario = state.store.get_scenario(&name).await?;
    scenario
        .map(Json)
        .ok_or_else(|| ApiError::from(ScenarioError::NotFound(name)))
}

/// Items of one version of a scenario.
pub async fn get_scenario_items(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<ItemsQuery>,
) -> Result<Json<Vec<ScenarioItem>>, ApiError> {
    Ok(Json(
        state.store.get_scenario_items(&name, params.version).await?,
    ))
}

/// Save a new version of a scenario.
pub async fn save_scenario(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<SaveScenarioRequest>,
) -> Result<(StatusCode, Json<VersionResponse>), ApiError> {
    let version = state
        .store
        .save_scenario(&name, &request.entity_ids, &request.weights)
        .await?;
    Ok((StatusCode::CREATED, Json(VersionResponse { version })))
}

/// Block until the scenario has a version newer than `since`.
pub async fn watch_scenario(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<WatchQuery>,
) -> Result<Json<VersionResponse>, ApiError> {
    let version = state.store.watch_scenario(&name, params.since).await?;
    Ok(Json(VersionResponse { version }))
}
