//! Route definitions for step-3 image generation.
//!
//! ```text
//! /projects/{project_id}/generation
//!   GET    /                 list_scenes
//!   POST   /all              generate_all (?wait=true)
//!   GET    /in-flight        list_in_flight
//!
//! /scenes
//!   POST   /{id}/generate    generate_scene
//!   POST   /{id}/regenerate  regenerate_scene
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Mounted at `/projects/{project_id}/generation`.
pub fn project_router() -> Router<AppState> {
    Router::new()
        .route("/", get(generation::list_scenes))
        .route("/all", post(generation::generate_all))
        .route("/in-flight", get(generation::list_in_flight))
}

/// Mounted at `/scenes`.
pub fn scene_router() -> Router<AppState> {
    Router::new()
        .route("/{id}/generate", post(generation::generate_scene))
        .route("/{id}/regenerate", post(generation::regenerate_scene))
}
