//! Handlers for the `/projects` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use storyboard_core::error::CoreError;
use storyboard_core::project::{updated_label, NewProjectForm};
use storyboard_core::types::{DbId, Timestamp};
use storyboard_db::models::project::{CreateProject, Project};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// One entry of the project list.
#[derive(Debug, Serialize)]
pub struct ProjectCard {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub updated_at: Timestamp,
    pub updated_label: String,
}

impl ProjectCard {
    fn new(project: Project, now: Timestamp) -> Self {
        Self {
            updated_label: updated_label(project.updated_at, now),
            id: project.id,
            name: project.name,
            description: project.description,
            updated_at: project.updated_at,
        }
    }
}

/// Load a project or fail with `NotFound`.
pub(crate) async fn ensure_project_exists(state: &AppState, id: DbId) -> AppResult<Project> {
    state
        .store
        .find_project(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<NewProjectForm>,
) -> AppResult<(StatusCode, Json<Project>)> {
    form.check()?;
    let project = state.store.create_project(&CreateProject::from(form)).await?;
    tracing::info!(project_id = %project.id, name = %project.name, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/v1/projects
///
/// A backend failure is logged and reported as an empty list.
pub async fn list(State(state): State<AppState>) -> Json<Vec<ProjectCard>> {
    let projects = match state.store.list_projects().await {
        Ok(projects) => projects,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load projects");
            Vec::new()
        }
    };
    let now = Utc::now();
    Json(
        projects
            .into_iter()
            .map(|p| ProjectCard::new(p, now))
            .collect(),
    )
}

/// GET /api/v1/projects/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Project>> {
    let project = ensure_project_exists(&state, id).await?;
    Ok(Json(project))
}
