//! Handlers for the step-2 scene list of an open wizard session.
//!
//! Every successful edit updates the step-2 blob right away and restarts
//! the autosave timer for the project.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyboard_core::scene_list::SceneField;
use storyboard_core::types::DbId;
use storyboard_core::wizard::WizardStep;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of `PATCH /scenes/{index}`.
#[derive(Debug, Deserialize)]
pub struct UpdateSceneField {
    pub field: SceneField,
    pub value: String,
}

// ---------------------------------------------------------------------------
// GET /projects/{id}/wizard/scenes
// ---------------------------------------------------------------------------

pub async fn list_scenes(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let view = session.lock().await.scene_view();
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// POST /projects/{id}/wizard/scenes
// ---------------------------------------------------------------------------

/// Append a blank scene.
pub async fn add_scene(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let view = {
        let mut guard = session.lock().await;
        guard.ensure_on(WizardStep::SceneList)?;
        guard.edit_scenes(|list| Ok(list.add()))?;
        guard.scene_view()
    };
    state.autosave.schedule(project_id, session);
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

// ---------------------------------------------------------------------------
// PATCH /projects/{id}/wizard/scenes/{index}
// ---------------------------------------------------------------------------

/// Replace the title or description of one scene.
pub async fn update_scene(
    State(state): State<AppState>,
    Path((project_id, index)): Path<(DbId, usize)>,
    Json(body): Json<UpdateSceneField>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let view = {
        let mut guard = session.lock().await;
        guard.ensure_on(WizardStep::SceneList)?;
        guard.edit_scenes(|list| list.update_field(index, body.field, body.value).map(|_| ()))?;
        guard.scene_view()
    };
    state.autosave.schedule(project_id, session);
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// DELETE /projects/{id}/wizard/scenes/{index}
// ---------------------------------------------------------------------------

/// Remove a scene and renumber the rest.
///
/// A persisted scene is deleted from the backend first. That delete is
/// best effort: a failure is logged and the scene is removed from the list
/// anyway.
pub async fn remove_scene(
    State(state): State<AppState>,
    Path((project_id, index)): Path<(DbId, usize)>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let view = {
        let mut guard = session.lock().await;
        guard.ensure_on(WizardStep::SceneList)?;

        let persisted_id = guard.scenes().get(index).and_then(|s| s.id);
        if let (Some(scene_id), true) = (persisted_id, guard.scenes().can_remove()) {
            match state.store.delete_scene(scene_id).await {
                Ok(true) => tracing::debug!(%project_id, %scene_id, "Deleted persisted scene"),
                Ok(false) => {
                    tracing::warn!(%project_id, %scene_id, "Persisted scene was already gone")
                }
                Err(e) => {
                    tracing::error!(%project_id, %scene_id, error = %e, "Failed to delete scene")
                }
            }
        }

        let removed = guard.edit_scenes(|list| list.remove(index))?;
        tracing::info!(
            %project_id,
            scene_number = removed.scene_number,
            remaining = guard.scenes().len(),
            "Scene removed"
        );
        guard.scene_view()
    };
    state.autosave.schedule(project_id, session);
    Ok(Json(DataResponse { data: view }))
}
