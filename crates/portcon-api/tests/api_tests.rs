//! Integration tests for the scenario API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. The store runs over the in-memory repository.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use portcon_api::router::build_router;
use portcon_api::state::AppState;
use portcon_core::{ScenarioStore, VersionWatcher};
use portcon_db::{MemoryScenarioRepository, ScenarioRepository};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_router(max_wait: Duration) -> Router {
    let repository: Arc<dyn ScenarioRepository> = Arc::new(MemoryScenarioRepository::new());
    let watcher = Arc::new(VersionWatcher::new(max_wait));
    let store = Arc::new(ScenarioStore::new(repository, watcher, "api-test"));
    build_router(Arc::new(AppState::new(store)))
}

fn test_router() -> Router {
    make_router(Duration::from_millis(200))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create(router: &Router, name: &str) -> Value {
    let (status, json) = send(
        router,
        post(
            "/api/scenarios",
            &json!({
                "name": name,
                "currency": "GBP",
                "implementation_date": "2026-09-30T00:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn health_reports_ok() {
    let router = test_router();
    let (status, json) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_list_and_get() {
    let router = test_router();
    let created = create(&router, "Core").await;
    assert_eq!(created["scenario_id"], 1);

    let (status, list) = send(&router, get("/api/scenarios")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["scenario_name"], "Core");
    assert_eq!(list[0]["currency"], "826");

    let (status, one) = send(&router, get("/api/scenarios/Core")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(one["created_by"], "api-test");
    assert_eq!(one["current_version"], 0);
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let router = test_router();
    create(&router, "Core").await;

    let (status, json) = send(
        &router,
        post(
            "/api/scenarios",
            &json!({
                "name": "Core",
                "currency": "USD",
                "implementation_date": "2026-09-30T00:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "already_exists");
    assert_eq!(json["status"], 409);
}

#[tokio::test]
async fn unknown_currency_is_unprocessable() {
    let router = test_router();
    let (status, json) = send(
        &router,
        post(
            "/api/scenarios",
            &json!({
                "name": "Core",
                "currency": "ABC",
                "implementation_date": "2026-09-30T00:00:00Z",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["kind"], "invalid_reference");
}

#[tokio::test]
async fn optional_lookup_without_name_is_null() {
    let router = test_router();
    create(&router, "Core").await;

    let (status, json) = send(&router, get("/api/scenario")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let (status, json) = send(&router, get("/api/scenario?name=")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.is_null());

    let (status, json) = send(&router, get("/api/scenario?name=Core")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scenario_name"], "Core");
}

#[tokio::test]
async fn unknown_scenario_is_not_found() {
    let router = test_router();
    let (status, json) = send(&router, get("/api/scenarios/Ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
    assert!(json["error"].as_str().unwrap().contains("Ghost"));

    let (status, _) = send(&router, get("/api/scenario?name=Ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn save_then_read_items() {
    let router = test_router();
    create(&router, "Core").await;

    let (status, json) = send(
        &router,
        post(
            "/api/scenarios/Core/versions",
            &json!({ "entity_ids": [10, 20], "weights": [0.4, 0.6] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["version"], 1);

    send(
        &router,
        post(
            "/api/scenarios/Core/versions",
            &json!({ "entity_ids": [30], "weights": [1.0] }),
        ),
    )
    .await;

    let (status, items) = send(&router, get("/api/scenarios/Core/items")).await;
    assert_eq!(status, StatusCode::OK);
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["entity_id"], 30);
    assert_eq!(items[0]["scenario_version"], 2);
    assert_eq!(items[0]["weight"], "1.00");

    let (_, first) = send(&router, get("/api/scenarios/Core/items?version=1")).await;
    assert_eq!(first.as_array().unwrap().len(), 2);
    assert_eq!(first[0]["weight"], "0.40");
}

#[tokio::test]
async fn bad_arguments_are_bad_requests() {
    let router = test_router();
    create(&router, "Core").await;

    let (status, json) = send(
        &router,
        post(
            "/api/scenarios/Core/versions",
            &json!({ "entity_ids": [1, 2], "weights": [0.5] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_argument");

    let (status, _) = send(&router, get("/api/scenarios/Core/items?version=-1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, get("/api/scenarios/Core/watch?since=-3")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn watch_returns_newer_version_at_once() {
    let router = make_router(Duration::from_secs(10));
    create(&router, "Core").await;
    for entity in [1, 2] {
        send(
            &router,
            post(
                "/api/scenarios/Core/versions",
                &json!({ "entity_ids": [entity], "weights": [1.0] }),
            ),
        )
        .await;
    }

    let started = std::time::Instant::now();
    let (status, json) = send(&router, get("/api/scenarios/Core/watch?since=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 2);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn watch_times_out_with_request_timeout() {
    let router = test_router();
    create(&router, "Core").await;

    let (status, json) = send(&router, get("/api/scenarios/Core/watch")).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json["kind"], "timeout");
}

#[tokio::test]
async fn watch_is_woken_by_save() {
    let router = make_router(Duration::from_secs(5));
    create(&router, "Core").await;

    let waiter = {
        let router = router.clone();
        tokio::spawn(async move { send(&router, get("/api/scenarios/Core/watch?since=0")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    send(
        &router,
        post(
            "/api/scenarios/Core/versions",
            &json!({ "entity_ids": [5], "weights": [0.5] }),
        ),
    )
    .await;

    let (status, json) = waiter.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["version"], 1);
}
