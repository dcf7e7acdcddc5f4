//! Storage seams the service is written against.
//!
//! [`ProjectStore`] and [`SceneStore`] cover exactly the query shapes the
//! wizard needs. [`PgStore`] implements them on top of the repositories;
//! [`crate::memory::MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use storyboard_core::types::DbId;

use crate::models::project::{CreateProject, Project, UpdateProjectSteps};
use crate::models::scene::{CreateScene, Scene, UpdateScene, UpdateSceneGeneration};
use crate::repositories::{ProjectRepo, SceneRepo};
use crate::DbPool;

/// Errors raised by any store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD access to the `projects` collection.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// All projects, most recently updated first.
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;

    async fn find_project(&self, id: DbId) -> StoreResult<Option<Project>>;

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project>;

    /// Overwrite all three step blobs. `None` when the project is gone.
    async fn update_project_steps(
        &self,
        id: DbId,
        input: &UpdateProjectSteps,
    ) -> StoreResult<Option<Project>>;
}

/// CRUD access to the `scenes` collection.
#[async_trait]
pub trait SceneStore: Send + Sync {
    /// A project's scenes ordered by `scene_number` ascending.
    async fn list_scenes(&self, project_id: DbId) -> StoreResult<Vec<Scene>>;

    async fn find_scene(&self, id: DbId) -> StoreResult<Option<Scene>>;

    async fn create_scene(&self, input: &CreateScene) -> StoreResult<Scene>;

    async fn update_scene(&self, id: DbId, input: &UpdateScene) -> StoreResult<Option<Scene>>;

    async fn update_scene_generation(
        &self,
        id: DbId,
        input: &UpdateSceneGeneration,
    ) -> StoreResult<Option<Scene>>;

    /// Returns `true` if a row was removed.
    async fn delete_scene(&self, id: DbId) -> StoreResult<bool>;
}

/// Everything the service needs from its backend.
#[async_trait]
pub trait Store: ProjectStore + SceneStore {
    /// Confirm the backend is reachable.
    async fn ping(&self) -> StoreResult<()>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`Store`] backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(ProjectRepo::list(&self.pool).await?)
    }

    async fn find_project(&self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project> {
        Ok(ProjectRepo::create(&self.pool, input).await?)
    }

    async fn update_project_steps(
        &self,
        id: DbId,
        input: &UpdateProjectSteps,
    ) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::update_steps(&self.pool, id, input).await?)
    }
}

#[async_trait]
impl SceneStore for PgStore {
    async fn list_scenes(&self, project_id: DbId) -> StoreResult<Vec<Scene>> {
        Ok(SceneRepo::list_by_project(&self.pool, project_id).await?)
    }

    async fn find_scene(&self, id: DbId) -> StoreResult<Option<Scene>> {
        Ok(SceneRepo::find_by_id(&self.pool, id).await?)
    }

    async fn create_scene(&self, input: &CreateScene) -> StoreResult<Scene> {
        Ok(SceneRepo::create(&self.pool, input).await?)
    }

    async fn update_scene(&self, id: DbId, input: &UpdateScene) -> StoreResult<Option<Scene>> {
        Ok(SceneRepo::update(&self.pool, id, input).await?)
    }

    async fn update_scene_generation(
        &self,
        id: DbId,
        input: &UpdateSceneGeneration,
    ) -> StoreResult<Option<Scene>> {
        Ok(SceneRepo::update_generation(&self.pool, id, input).await?)
    }

    async fn delete_scene(&self, id: DbId) -> StoreResult<bool> {
        Ok(SceneRepo::delete(&self.pool, id).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
