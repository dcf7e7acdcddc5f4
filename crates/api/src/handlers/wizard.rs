//! Handlers for the storyboard wizard session of a project.
//!
//! A session is opened from the project list, walks through the three
//! steps, and ends either by finalizing (all three step blobs are written
//! back to the project) or by closing it without saving the draft.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use storyboard_core::error::CoreError;
use storyboard_core::story::StoryDetails;
use storyboard_core::types::DbId;
use storyboard_core::wizard::{StepUpdate, WizardState, WizardStep};
use storyboard_db::models::project::UpdateProjectSteps;

use crate::engine::session::{reload_scenes, SessionView};
use crate::error::{AppError, AppResult};
use crate::handlers::project::ensure_project_exists;
use crate::response::DataResponse;
use crate::state::AppState;

/// Step-1 response: the stored details plus blank required fields.
#[derive(Debug, Serialize)]
pub struct StoryView {
    pub story: StoryDetails,
    pub missing_required: Vec<&'static str>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Apply a navigation to the project's session.
///
/// Entering step 2 reloads persisted scenes; leaving it flushes a pending
/// autosave.
async fn navigate(
    state: &AppState,
    project_id: DbId,
    nav: impl FnOnce(&mut WizardState) -> Result<WizardStep, CoreError>,
) -> AppResult<SessionView> {
    let session = state.sessions.require(project_id).await?;

    let (from, to) = {
        let mut session = session.lock().await;
        let from = session.current_step();
        let to = nav(session.state_mut())?;
        if to == WizardStep::SceneList && from != WizardStep::SceneList {
            reload_scenes(state.store.as_ref(), &mut session).await;
        }
        (from, to)
    };

    if from == WizardStep::SceneList && to != WizardStep::SceneList {
        state.autosave.flush(project_id).await;
    }
    let view = session.lock().await.view();

    tracing::info!(
        %project_id,
        from_step = from.to_number(),
        to_step = to.to_number(),
        "Wizard step changed"
    );
    Ok(view)
}

// ---------------------------------------------------------------------------
// POST /projects/{id}/wizard
// ---------------------------------------------------------------------------

/// Open the wizard for a project, or resume the session already open.
pub async fn open_session(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let project = ensure_project_exists(&state, project_id).await?;
    let (session, created) = state.sessions.open(project).await;
    let view = session.lock().await.view();

    let status = if created {
        tracing::info!(%project_id, "Wizard session opened");
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(DataResponse { data: view })))
}

// ---------------------------------------------------------------------------
// GET /projects/{id}/wizard
// ---------------------------------------------------------------------------

pub async fn get_session(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let view = session.lock().await.view();
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// DELETE /projects/{id}/wizard
// ---------------------------------------------------------------------------

/// Back to the project list. The draft is discarded, but scene edits still
/// waiting on the autosave timer are written first.
pub async fn close_session(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.sessions.require(project_id).await?;
    state.autosave.flush(project_id).await;
    state.sessions.close(project_id).await;
    tracing::info!(%project_id, "Wizard session closed without saving");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// POST /projects/{id}/wizard/next
pub async fn next_step(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = navigate(&state, project_id, WizardState::next).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /projects/{id}/wizard/previous
pub async fn previous_step(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = navigate(&state, project_id, WizardState::previous).await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /projects/{id}/wizard/steps/{step}
///
/// Jump through the step indicator: any earlier step, or the next one.
pub async fn go_to_step(
    State(state): State<AppState>,
    Path((project_id, step)): Path<(DbId, u8)>,
) -> AppResult<impl IntoResponse> {
    let view = navigate(&state, project_id, |wizard| wizard.go_to(step)).await?;
    Ok(Json(DataResponse { data: view }))
}

// ---------------------------------------------------------------------------
// PUT /projects/{id}/wizard/story
// ---------------------------------------------------------------------------

/// Replace the step-1 blob with the full set of story fields.
pub async fn update_story(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(story): Json<StoryDetails>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    let mut session = session.lock().await;
    let missing_required = story.missing_required();
    session
        .state_mut()
        .submit(StepUpdate::StoryDetails(story.clone()))?;

    Ok(Json(DataResponse {
        data: StoryView {
            story,
            missing_required,
        },
    }))
}

// ---------------------------------------------------------------------------
// PUT /projects/{id}/wizard/step3
// ---------------------------------------------------------------------------

/// Replace the step-3 blob.
pub async fn update_generation_step(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Json(blob): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    if !blob.is_object() {
        return Err(AppError::BadRequest(
            "Step data must be a JSON object".to_string(),
        ));
    }
    let session = state.sessions.require(project_id).await?;
    let mut session = session.lock().await;
    session
        .state_mut()
        .submit(StepUpdate::ImageGeneration(blob))?;
    Ok(Json(DataResponse {
        data: session.view(),
    }))
}

// ---------------------------------------------------------------------------
// POST /projects/{id}/wizard/finalize
// ---------------------------------------------------------------------------

/// Persist all three step blobs and close the session.
///
/// On failure the session stays open on the last step with its draft.
pub async fn finalize(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let session = state.sessions.require(project_id).await?;
    session.lock().await.state().ensure_can_finalize()?;
    state.autosave.flush(project_id).await;
    let draft = session.lock().await.state().draft().clone();

    let update = UpdateProjectSteps::from_draft(&draft, Utc::now());
    let project = state
        .store
        .update_project_steps(project_id, &update)
        .await
        .map_err(|e| {
            tracing::error!(%project_id, error = %e, "Failed to save project");
            AppError::from(e)
        })?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    state.sessions.close(project_id).await;
    tracing::info!(%project_id, "Project finalized");

    Ok(Json(DataResponse { data: project }))
}
