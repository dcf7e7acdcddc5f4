//! In-process [`Store`] implementation.
//!
//! Keeps both tables in memory behind one async lock. Used when the service
//! runs with `STORE_BACKEND=memory` and by the test suites, which can also
//! switch individual operations into failure mode to exercise the service's
//! error paths.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use storyboard_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use crate::models::project::{CreateProject, Project, UpdateProjectSteps};
use crate::models::scene::{CreateScene, Scene, UpdateScene, UpdateSceneGeneration};
use crate::store::{ProjectStore, SceneStore, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    projects: HashMap<DbId, Project>,
    scenes: HashMap<DbId, Scene>,
    last_timestamp: Option<Timestamp>,
    unavailable: bool,
    failing_project_updates: bool,
    failing_scenes: HashSet<DbId>,
    scene_insert_delay: std::time::Duration,
}

impl Tables {
    /// Wall-clock time, nudged forward so successive writes never tie.
    fn tick(&mut self) -> Timestamp {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    fn check_scene_writable(&self, id: DbId) -> StoreResult<()> {
        self.check_available()?;
        if self.failing_scenes.contains(&id) {
            return Err(StoreError::Unavailable(format!("writes to scene {id} are failing")));
        }
        Ok(())
    }
}

/// [`Store`] that lives entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`StoreError::Unavailable`].
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.write().await.unavailable = unavailable;
    }

    /// Make `update_project_steps` fail.
    pub async fn set_failing_project_updates(&self, failing: bool) {
        self.tables.write().await.failing_project_updates = failing;
    }

    /// Make every write to one scene fail.
    pub async fn fail_writes_for_scene(&self, id: DbId) {
        self.tables.write().await.failing_scenes.insert(id);
    }

    /// Make `create_scene` sleep before it writes, so a save pass can be
    /// caught mid-insert.
    pub async fn set_scene_insert_delay(&self, delay: std::time::Duration) {
        self.tables.write().await.scene_insert_delay = delay;
    }

    /// Number of stored scenes across all projects.
    pub async fn scene_count(&self) -> usize {
        self.tables.read().await.scenes.len()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        tables.check_available()?;
        let mut projects: Vec<Project> = tables.projects.values().cloned().collect();
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    async fn find_project(&self, id: DbId) -> StoreResult<Option<Project>> {
        let tables = self.tables.read().await;
        tables.check_available()?;
        Ok(tables.projects.get(&id).cloned())
    }

    async fn create_project(&self, input: &CreateProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        tables.check_available()?;
        let now = tables.tick();
        let project = Project {
            id: DbId::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            api_key: input.api_key.clone(),
            cookies: input.cookies.clone(),
            step1_data: input.step1_data.clone(),
            step2_data: input.step2_data.clone(),
            step3_data: input.step3_data.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project_steps(
        &self,
        id: DbId,
        input: &UpdateProjectSteps,
    ) -> StoreResult<Option<Project>> {
        let mut tables = self.tables.write().await;
        tables.check_available()?;
        if tables.failing_project_updates {
            return Err(StoreError::Unavailable(format!("writes to project {id} are failing")));
        }
        let now = tables.tick().max(input.updated_at);
        Ok(tables.projects.get_mut(&id).map(|project| {
            project.step1_data = input.step1_data.clone();
            project.step2_data = input.step2_data.clone();
            project.step3_data = input.step3_data.clone();
            project.updated_at = now;
            project.clone()
        }))
    }
}

#[async_trait]
impl SceneStore for MemoryStore {
    async fn list_scenes(&self, project_id: DbId) -> StoreResult<Vec<Scene>> {
        let tables = self.tables.read().await;
        tables.check_available()?;
        let mut scenes: Vec<Scene> = tables
            .scenes
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        scenes.sort_by(|a, b| {
            a.scene_number
                .cmp(&b.scene_number)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(scenes)
    }

    async fn find_scene(&self, id: DbId) -> StoreResult<Option<Scene>> {
        let tables = self.tables.read().await;
        tables.check_available()?;
        Ok(tables.scenes.get(&id).cloned())
    }

    async fn create_scene(&self, input: &CreateScene) -> StoreResult<Scene> {
        let delay = self.tables.read().await.scene_insert_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut tables = self.tables.write().await;
        tables.check_available()?;
        if !tables.projects.contains_key(&input.project_id) {
            return Err(StoreError::Unavailable(format!(
                "project {} does not exist",
                input.project_id
            )));
        }
        let now = tables.tick();
        let scene = Scene {
            id: DbId::new_v4(),
            project_id: input.project_id,
            scene_number: input.scene_number,
            title: input.title.clone(),
            description: input.description.clone(),
            prompt: None,
            images: Vec::new(),
            status: input.status,
            created_at: now,
            updated_at: now,
        };
        tables.scenes.insert(scene.id, scene.clone());
        Ok(scene)
    }

    async fn update_scene(&self, id: DbId, input: &UpdateScene) -> StoreResult<Option<Scene>> {
        let mut tables = self.tables.write().await;
        tables.check_scene_writable(id)?;
        let now = tables.tick();
        Ok(tables.scenes.get_mut(&id).map(|scene| {
            scene.title = input.title.clone();
            scene.description = input.description.clone();
            scene.scene_number = input.scene_number;
            scene.updated_at = now;
            scene.clone()
        }))
    }

    async fn update_scene_generation(
        &self,
        id: DbId,
        input: &UpdateSceneGeneration,
    ) -> StoreResult<Option<Scene>> {
        let mut tables = self.tables.write().await;
        tables.check_scene_writable(id)?;
        let now = tables.tick();
        Ok(tables.scenes.get_mut(&id).map(|scene| {
            scene.status = input.status;
            if let Some(images) = &input.images {
                scene.images = images.clone();
            }
            scene.updated_at = now;
            scene.clone()
        }))
    }

    async fn delete_scene(&self, id: DbId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.check_scene_writable(id)?;
        Ok(tables.scenes.remove(&id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.tables.read().await.check_available()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
