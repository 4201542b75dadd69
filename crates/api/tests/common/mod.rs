#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use trees_core::workflow::WorkflowAllowlist;
use trees_db::memory::MemoryStore;
use trees_galaxy::mock::ScriptedWorkflowService;

use trees_api::config::ServerConfig;
use trees_api::router::build_app_router;
use trees_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        workflow_allowlist: WorkflowAllowlist::allow_all(),
        sync_enabled: false,
    }
}

/// The app under test plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub workflows: Arc<ScriptedWorkflowService>,
}

/// Build the full application router over an in-memory store and a
/// scripted workflow service. Dataset `ds1` is registered in the catalog.
pub async fn build_test_app() -> TestApp {
    build_test_app_with(test_config()).await
}

pub async fn build_test_app_with(config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store.add_dataset("ds1", "LAS/ds1.laz").await;
    let workflows = Arc::new(ScriptedWorkflowService::new());

    let state = AppState {
        store: store.clone(),
        catalog: store.clone(),
        workflows: workflows.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        workflows,
    }
}

/// Read the full response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: &TestApp, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}
