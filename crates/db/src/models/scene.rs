//! Scene entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use storyboard_core::scene_list::{SceneDraft, SceneImage, SceneStatus};
use storyboard_core::types::{DbId, Timestamp};

/// A row from the `scenes` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Scene {
    pub id: DbId,
    pub project_id: DbId,
    pub scene_number: i32,
    pub title: String,
    pub description: String,
    pub prompt: Option<String>,
    #[sqlx(json)]
    pub images: Vec<SceneImage>,
    #[sqlx(try_from = "String")]
    pub status: SceneStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Scene {
    /// The editable part of this row, as step 2 sees it.
    pub fn to_draft(&self) -> SceneDraft {
        SceneDraft {
            id: Some(self.id),
            scene_number: self.scene_number,
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }
}

/// DTO for inserting a scene on its first autosave.
#[derive(Debug, Clone)]
pub struct CreateScene {
    pub project_id: DbId,
    pub scene_number: i32,
    pub title: String,
    pub description: String,
    pub status: SceneStatus,
}

impl CreateScene {
    /// Insert payload for an unsaved draft; new scenes start `pending`.
    pub fn from_draft(project_id: DbId, draft: &SceneDraft) -> Self {
        Self {
            project_id,
            scene_number: draft.scene_number,
            title: draft.title.clone(),
            description: draft.description.clone(),
            status: SceneStatus::Pending,
        }
    }
}

/// DTO for the autosave update of an already persisted scene.
#[derive(Debug, Clone)]
pub struct UpdateScene {
    pub title: String,
    pub description: String,
    pub scene_number: i32,
}

impl From<&SceneDraft> for UpdateScene {
    fn from(draft: &SceneDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            scene_number: draft.scene_number,
        }
    }
}

/// DTO for generation status writes.
///
/// `images: None` leaves the stored images untouched.
#[derive(Debug, Clone)]
pub struct UpdateSceneGeneration {
    pub status: SceneStatus,
    pub images: Option<Vec<SceneImage>>,
}
