//! Repository for the `projects` table.

use sqlx::PgPool;
use storyboard_core::types::DbId;

use crate::models::project::{CreateProject, Project, UpdateProjectSteps};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, description, api_key, cookies, \
    step1_data, step2_data, step3_data, created_at, updated_at";

/// Provides CRUD operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects
                (name, description, api_key, cookies, step1_data, step2_data, step3_data)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.api_key)
            .bind(&input.cookies)
            .bind(&input.step1_data)
            .bind(&input.step2_data)
            .bind(&input.step3_data)
            .fetch_one(pool)
            .await
    }

    /// Find a project by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all projects, most recently updated first.
    pub async fn list(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY updated_at DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Overwrite all three step blobs.
    ///
    /// `updated_at` is written explicitly; the row trigger then bumps it to
    /// the transaction time. Returns `None` if no row with the given `id`
    /// exists.
    pub async fn update_steps(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProjectSteps,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                step1_data = $2,
                step2_data = $3,
                step3_data = $4,
                updated_at = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.step1_data)
            .bind(&input.step2_data)
            .bind(&input.step3_data)
            .bind(input.updated_at)
            .fetch_optional(pool)
            .await
    }
}
