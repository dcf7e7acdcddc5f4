//! Handlers for step 3: scene cards, single-scene generation, and
//! "generate all".

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use storyboard_core::error::CoreError;
use storyboard_core::generation::{needs_generation, BatchReport};
use storyboard_core::types::DbId;
use storyboard_db::models::scene::Scene;

use crate::engine::generator::GenerationContext;
use crate::error::{AppError, AppResult};
use crate::handlers::project::ensure_project_exists;
use crate::response::DataResponse;
use crate::state::AppState;

/// A scene as shown on the generation step.
#[derive(Debug, Serialize)]
pub struct SceneCard {
    #[serde(flatten)]
    pub scene: Scene,
    pub is_generating: bool,
}

/// Query parameters for `POST /generation/all`.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateAllParams {
    /// Wait for the batch and return its report instead of running detached.
    #[serde(default)]
    pub wait: bool,
}

/// Response body of a detached "generate all".
#[derive(Debug, Serialize)]
pub struct GenerateAllAccepted {
    pub queued: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn card(state: &AppState, scene: Scene) -> SceneCard {
    let is_generating = state.generation.in_flight().contains(scene.id);
    SceneCard {
        scene,
        is_generating,
    }
}

async fn ensure_scene_exists(state: &AppState, id: DbId) -> AppResult<Scene> {
    state
        .store
        .find_scene(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Scene",
            id,
        }))
}

/// Run a whole batch on its own task and wait for it.
///
/// The batch outlives the request: a timeout or a dropped connection ends
/// the wait, not the generation.
async fn run_batch(
    state: &AppState,
    scenes: Vec<Scene>,
    ctx: GenerationContext,
) -> AppResult<BatchReport> {
    let runner = state.generation.clone();
    tokio::spawn(async move { runner.generate_all(scenes, &ctx).await })
        .await
        .map_err(|e| AppError::InternalError(format!("Generate-all task failed: {e}")))
}

/// Shared body of generate and regenerate.
async fn run_single(state: &AppState, scene_id: DbId) -> AppResult<SceneCard> {
    let scene = ensure_scene_exists(state, scene_id).await?;
    let project = ensure_project_exists(state, scene.project_id).await?;
    let ctx = GenerationContext::for_project(&project);

    let runner = state.generation.clone();
    let outcome = tokio::spawn(async move { runner.generate(&scene, &ctx).await })
        .await
        .map_err(|e| AppError::InternalError(format!("Generation task failed: {e}")))?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(format!(
                "Scene {scene_id} is already generating"
            )))
        })?;
    tracing::debug!(%scene_id, status = outcome.status.as_str(), "Single-scene generation done");

    let scene = ensure_scene_exists(state, scene_id).await?;
    Ok(card(state, scene))
}

// ---------------------------------------------------------------------------
// GET /projects/{id}/generation
// ---------------------------------------------------------------------------

/// The project's scenes in scene order, each flagged when in flight.
///
/// A backend failure is logged and yields an empty list.
pub async fn list_scenes(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> impl IntoResponse {
    let mut scenes = match state.store.list_scenes(project_id).await {
        Ok(scenes) => scenes,
        Err(e) => {
            tracing::error!(%project_id, error = %e, "Failed to load scenes");
            Vec::new()
        }
    };
    if state.config.reconcile_stuck_generating {
        state.generation.reconcile_stuck(&mut scenes).await;
    }
    let cards: Vec<SceneCard> = scenes.into_iter().map(|s| card(&state, s)).collect();
    Json(DataResponse { data: cards })
}

// ---------------------------------------------------------------------------
// GET /projects/{id}/generation/in-flight
// ---------------------------------------------------------------------------

pub async fn list_in_flight(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let in_flight = state.generation.in_flight().snapshot();
    let ids: Vec<DbId> = state
        .store
        .list_scenes(project_id)
        .await?
        .into_iter()
        .map(|s| s.id)
        .filter(|id| in_flight.contains(id))
        .collect();
    Ok(Json(DataResponse { data: ids }))
}

// ---------------------------------------------------------------------------
// POST /scenes/{id}/generate, POST /scenes/{id}/regenerate
// ---------------------------------------------------------------------------

/// Generate images for one scene and return it afterwards.
///
/// A failed generation is not an error response: the returned scene simply
/// carries `status = error`.
pub async fn generate_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let card = run_single(&state, scene_id).await?;
    Ok(Json(DataResponse { data: card }))
}

/// Same as [`generate_scene`]; previous images are replaced.
pub async fn regenerate_scene(
    State(state): State<AppState>,
    Path(scene_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let card = run_single(&state, scene_id).await?;
    Ok(Json(DataResponse { data: card }))
}

// ---------------------------------------------------------------------------
// POST /projects/{id}/generation/all
// ---------------------------------------------------------------------------

/// Generate every scene that is not completed yet.
///
/// Runs detached and answers `202` with the queued scene ids, or with
/// `?wait=true` answers once the batch is done with its report.
pub async fn generate_all(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Query(params): Query<GenerateAllParams>,
) -> AppResult<Response> {
    let project = ensure_project_exists(&state, project_id).await?;
    let scenes = state.store.list_scenes(project_id).await?;
    let ctx = GenerationContext::for_project(&project);

    if params.wait {
        let report = run_batch(&state, scenes, ctx).await?;
        return Ok(Json(DataResponse { data: report }).into_response());
    }

    let in_flight = state.generation.in_flight();
    let queued: Vec<DbId> = scenes
        .iter()
        .filter(|s| needs_generation(s.status) && !in_flight.contains(s.id))
        .map(|s| s.id)
        .collect();
    tracing::info!(%project_id, queued = queued.len(), "Generate-all batch started");

    let runner = state.generation.clone();
    tokio::spawn(async move {
        runner.generate_all(scenes, &ctx).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: GenerateAllAccepted { queued },
        }),
    )
        .into_response())
}
