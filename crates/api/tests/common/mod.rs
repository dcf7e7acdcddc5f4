#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use storyboard_api::config::{ServerConfig, StoreBackend};
use storyboard_api::engine::generator::{
    GenerationContext, GenerationError, ImageGenerator, PlaceholderGenerator,
};
use storyboard_api::router::build_app_router;
use storyboard_api::state::AppState;
use storyboard_core::generation::placeholder_image;
use storyboard_core::scene_list::{SceneDraft, SceneImage};
use storyboard_core::types::DbId;
use storyboard_db::memory::MemoryStore;
use storyboard_db::models::scene::{CreateScene, Scene};
use storyboard_db::store::SceneStore;

/// Autosave debounce used by the test config.
pub const TEST_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Build a test `ServerConfig` on the in-memory store.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        store_backend: StoreBackend::Memory,
        autosave_debounce: TEST_DEBOUNCE,
        generation_delay: Duration::ZERO,
        ..ServerConfig::default()
    }
}

/// Router plus handles on its state and backing store.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config(), Arc::new(PlaceholderGenerator::new(Duration::ZERO)))
}

pub fn build_test_app_with_generator(generator: Arc<dyn ImageGenerator>) -> TestApp {
    build_test_app_with(test_config(), generator)
}

/// Build the full application router with all middleware layers, exactly as
/// `main.rs` does.
pub fn build_test_app_with(config: ServerConfig, generator: Arc<dyn ImageGenerator>) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_generator(store.clone(), config.clone(), generator);
    let router = build_app_router(state.clone(), &config);
    TestApp {
        router,
        state,
        store,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str) -> Response {
    send(app, Method::POST, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: Value) -> Response {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

/// Read the response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a project through the API and return its id.
pub async fn create_project(app: &Router, name: &str) -> DbId {
    let json = expect_json(
        post_json(
            app,
            "/api/v1/projects",
            serde_json::json!({ "name": name, "api_key": "k1" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    json["id"].as_str().unwrap().parse().unwrap()
}

/// Create a project and open its wizard session.
pub async fn open_wizard(app: &Router) -> DbId {
    let id = create_project(app, "Test").await;
    let response = post(app, &format!("/api/v1/projects/{id}/wizard")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    id
}

/// Insert persisted scenes 1..=count directly into the store.
pub async fn seed_scenes(store: &MemoryStore, project_id: DbId, count: i32) -> Vec<Scene> {
    for n in 1..=count {
        let draft = SceneDraft {
            title: format!("Scene {n}"),
            ..SceneDraft::blank(n)
        };
        store
            .create_scene(&CreateScene::from_draft(project_id, &draft))
            .await
            .unwrap();
    }
    store.list_scenes(project_id).await.unwrap()
}

pub fn wizard_uri(project_id: DbId, rest: &str) -> String {
    format!("/api/v1/projects/{project_id}/wizard{rest}")
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Generator that fails for the given scene numbers.
pub struct FailingGenerator {
    pub fail: Vec<i32>,
}

#[async_trait]
impl ImageGenerator for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(
        &self,
        scene: &Scene,
        _ctx: &GenerationContext,
    ) -> Result<Vec<SceneImage>, GenerationError> {
        if self.fail.contains(&scene.scene_number) {
            return Err(GenerationError::Failed(format!(
                "scene {} refused",
                scene.scene_number
            )));
        }
        Ok(vec![placeholder_image(scene.scene_number, 1)])
    }
}
