pub mod generation;
pub mod health;
pub mod project;
pub mod wizard;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                        list, create
/// /projects/{project_id}                           get
/// /projects/{project_id}/wizard/...                wizard session (see routes::wizard)
/// /projects/{project_id}/generation/...            step-3 generation (see routes::generation)
///
/// /scenes/{id}/generate                            generate one scene (POST)
/// /scenes/{id}/regenerate                          regenerate one scene (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", project::router())
        .nest("/scenes", generation::scene_router())
}
