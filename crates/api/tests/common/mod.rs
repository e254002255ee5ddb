#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use herald_api::config::ServerConfig;
use herald_api::router::build_app_router;
use herald_api::services::EventServices;
use herald_api::state::AppState;
use herald_events::MemoryEventStore;

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and no publisher secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..ServerConfig::default()
    }
}

/// A fully wired application backed by an in-memory event log.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryEventStore>,
    pub services: EventServices,
    pub state: AppState,
}

/// Build the full application router with all middleware layers on top of a
/// [`MemoryEventStore`].
///
/// Uses the same [`build_app_router`] as `main.rs` so integration tests
/// exercise the production middleware stack.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryEventStore::new());
    let services = EventServices::new(store.clone(), &config);
    let state = AppState::new(config, &services, None);
    let router = build_app_router(state.clone());

    TestApp {
        router,
        store,
        services,
        state,
    }
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, &body.to_string(), None).await
}

/// POST `body` verbatim with a JSON content type and an optional bearer token.
pub async fn post_raw(
    app: Router,
    uri: &str,
    body: &str,
    bearer: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
