//! Repository for the `scenes` table.

use sqlx::types::Json;
use sqlx::PgPool;
use storyboard_core::types::DbId;

use crate::models::scene::{CreateScene, Scene, UpdateScene, UpdateSceneGeneration};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, project_id, scene_number, title, description, prompt, \
    images, status, created_at, updated_at";

/// Provides CRUD operations for scenes.
pub struct SceneRepo;

impl SceneRepo {
    /// Insert a new scene with no images, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateScene) -> Result<Scene, sqlx::Error> {
        let query = format!(
            "INSERT INTO scenes (project_id, scene_number, title, description, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(input.project_id)
            .bind(input.scene_number)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.status.as_str())
            .fetch_one(pool)
            .await
    }

    /// Find a scene by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Scene>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scenes WHERE id = $1");
        sqlx::query_as::<_, Scene>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all scenes of a project ordered by `scene_number` ascending.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Scene>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scenes
             WHERE project_id = $1
             ORDER BY scene_number ASC"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Autosave update of the editable fields.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateScene,
    ) -> Result<Option<Scene>, sqlx::Error> {
        let query = format!(
            "UPDATE scenes SET
                title = $2,
                description = $3,
                scene_number = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.scene_number)
            .fetch_optional(pool)
            .await
    }

    /// Write a generation status, optionally replacing the images.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update_generation(
        pool: &PgPool,
        id: DbId,
        input: &UpdateSceneGeneration,
    ) -> Result<Option<Scene>, sqlx::Error> {
        let query = format!(
            "UPDATE scenes SET
                status = $2,
                images = COALESCE($3, images)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Scene>(&query)
            .bind(id)
            .bind(input.status.as_str())
            .bind(input.images.as_ref().map(Json))
            .fetch_optional(pool)
            .await
    }

    /// Permanently delete a scene by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scenes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
