//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use catalog_api::app::{build_dispatcher, build_router};
use catalog_api::state::AppState;
use catalog_core::clock::SharedClock;
use catalog_core::store::SharedStore;
use catalog_products::application::services::ProductServices;
use catalog_store::in_memory::InMemoryEntityStore;
use catalog_test_support::{RecordingPublisher, SteppingClock};
use http_body_util::BodyExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// A router over an in-memory store plus handles for inspecting it.
pub struct TestApp {
    pub router: Router,
    pub publisher: Arc<RecordingPublisher>,
    pub shutdown: CancellationToken,
}

/// Clock that starts at a fixed instant and ticks one second per read, so
/// creation order is unambiguous.
fn stepping_clock() -> SharedClock {
    Arc::new(SteppingClock::new(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
        chrono::Duration::seconds(1),
    ))
}

/// Build the full app router over a fresh in-memory store. Uses the same
/// assembly as `main.rs`.
pub fn build_test_app() -> TestApp {
    let store: SharedStore = Arc::new(InMemoryEntityStore::new());
    build_test_app_with_store(store)
}

/// Build the full app router over `store`.
pub fn build_test_app_with_store(store: SharedStore) -> TestApp {
    let publisher = Arc::new(RecordingPublisher::new());
    let services = ProductServices::new(store, publisher.clone(), stepping_clock());
    let dispatcher = build_dispatcher(&services).unwrap();
    let shutdown = CancellationToken::new();
    let router = build_router(AppState::new(Arc::new(dispatcher), shutdown.clone()));
    TestApp {
        router,
        publisher,
        shutdown,
    }
}

/// Send a request and return status, headers and the JSON body. An empty
/// body reads as `Null`; a non-JSON body reads as a string.
pub async fn send(
    app: &TestApp,
    method: &str,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        })
    };

    (status, headers, json)
}

/// Send a POST request with a JSON body.
pub async fn post_json(
    app: &TestApp,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    send(app, "POST", uri, Some(body)).await
}

/// Send a GET request.
pub async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, json) = send(app, "GET", uri, None).await;
    (status, json)
}

/// Create a product and return its id.
pub async fn create_product(app: &TestApp, name: &str, unit_price: f64) -> String {
    let (status, _, json) = post_json(
        app,
        "/api/products",
        &serde_json::json!({ "name": name, "unitPrice": unit_price }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_str().unwrap().to_owned()
}
