#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use comanda_core::types::Tenant;
use comanda_notify::testing::{self, InMemoryDirectory, InMemoryStore, Recorders};
use comanda_notify::NotifyConfig;
use http_body_util::BodyExt;
use tower::ServiceExt;

use comanda_api::config::ServerConfig;
use comanda_api::router::build_app_router;
use comanda_api::state::AppState;

pub const TENANT: Tenant = Tenant {
    org_id: 1,
    project_id: 10,
};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: None,
    }
}

/// The application over in-memory collaborators, with handles to inspect
/// what it stored and sent.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub recorders: Recorders,
}

/// Build the full application router with all middleware layers and one
/// project registered for [`TENANT`].
pub fn build_test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let directory = Arc::new(InMemoryDirectory::new());
    directory.add_project(testing::project(TENANT));
    let recorders = Recorders::new();

    let state = AppState::new(
        test_config(),
        &NotifyConfig::default(),
        None,
        store.clone(),
        directory.clone(),
        recorders.registry(),
    );

    TestApp {
        router: build_app_router(state),
        store,
        directory,
        recorders,
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Send a GET request without tenant headers.
pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

/// Send a GET request carrying `tenant` in the tenant headers.
pub async fn get_as(app: &TestApp, tenant: Tenant, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-org-id", tenant.org_id.to_string())
        .header("x-project-id", tenant.project_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

/// Send a JSON request carrying `tenant` in the tenant headers.
pub async fn send_json_as(
    app: &TestApp,
    method: Method,
    tenant: Option<Tenant>,
    uri: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(tenant) = tenant {
        builder = builder
            .header("x-org-id", tenant.org_id.to_string())
            .header("x-project-id", tenant.project_id.to_string());
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    send_json_as(app, Method::POST, Some(TENANT), uri, body).await
}

/// POST a URL-encoded form without tenant headers.
pub async fn post_form(app: &TestApp, uri: &str, form: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}
