use axum::routing::get;
use axum::Router;

use crate::handlers::project;
use crate::routes::{generation, wizard};
use crate::state::AppState;

/// Project routes, mounted at `/projects`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(project::list).post(project::create))
        .route("/{project_id}", get(project::get_by_id))
        .nest("/{project_id}/wizard", wizard::router())
        .nest("/{project_id}/generation", generation::project_router())
}
