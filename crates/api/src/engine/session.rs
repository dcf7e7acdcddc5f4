//! Per-project wizard sessions.
//!
//! A session is opened when the user picks a project and holds the wizard
//! state (current step plus draft) and the editable scene list until the
//! user finalizes or goes back to the project list. Each session sits
//! behind its own async mutex; the registry only hands out shared handles.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use storyboard_core::error::CoreError;
use storyboard_core::scene_list::{SceneDraft, SceneList};
use storyboard_core::story::StoryDetails;
use storyboard_core::types::DbId;
use storyboard_core::wizard::{Draft, StepIndicator, StepUpdate, WizardState, WizardStep};
use storyboard_db::models::project::Project;
use storyboard_db::models::scene::Scene;
use storyboard_db::store::Store;
use tokio::sync::{Mutex, RwLock};

/// Shared handle to one open session.
pub type SharedSession = Arc<Mutex<WizardSession>>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Wizard state for one open project.
#[derive(Debug)]
pub struct WizardSession {
    project: Project,
    state: WizardState,
    scenes: SceneList,
}

impl WizardSession {
    /// Start on step 1 with the project's stored blobs as the draft.
    pub fn open(project: Project) -> Self {
        let draft = project.draft();
        let scenes = SceneList::from_blob(&draft.step2_data);
        Self {
            project,
            state: WizardState::new(draft),
            scenes,
        }
    }

    pub fn project_id(&self) -> DbId {
        self.project.id
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut WizardState {
        &mut self.state
    }

    pub fn scenes(&self) -> &SceneList {
        &self.scenes
    }

    pub fn current_step(&self) -> WizardStep {
        self.state.current()
    }

    /// Reject operations that belong to a step the user is not on.
    pub fn ensure_on(&self, step: WizardStep) -> Result<(), CoreError> {
        let current = self.state.current();
        if current != step {
            return Err(CoreError::Validation(format!(
                "Operation belongs to step {} but the wizard is on step {}",
                step.to_number(),
                current.to_number()
            )));
        }
        Ok(())
    }

    /// Apply an edit to the scene list and mirror the result into the
    /// step-2 blob. A failed edit leaves both untouched.
    pub fn edit_scenes<T>(
        &mut self,
        edit: impl FnOnce(&mut SceneList) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut scenes = self.scenes.clone();
        let out = edit(&mut scenes)?;
        self.replace_scenes(scenes);
        Ok(out)
    }

    /// Swap in a whole new scene list.
    pub fn replace_scenes(&mut self, scenes: SceneList) {
        self.state.apply(StepUpdate::SceneList(scenes.clone()));
        self.scenes = scenes;
    }

    /// Record a backend id for a freshly inserted scene.
    pub fn assign_scene_id(&mut self, index: usize, scene_number: i32, id: DbId) -> bool {
        let assigned = self.scenes.assign_id(index, scene_number, id);
        if assigned {
            self.state.apply(StepUpdate::SceneList(self.scenes.clone()));
        }
        assigned
    }

    /// Snapshot for API responses.
    pub fn view(&self) -> SessionView {
        let draft = self.state.draft();
        SessionView {
            project_id: self.project.id,
            project_name: self.project.name.clone(),
            current_step: self.state.current().to_number(),
            steps: self.state.indicators(),
            missing_required: StoryDetails::from_blob(&draft.step1_data).missing_required(),
            draft: draft.clone(),
        }
    }

    pub fn scene_view(&self) -> SceneListView {
        SceneListView {
            scenes: self.scenes.scenes().to_vec(),
            can_remove: self.scenes.can_remove(),
        }
    }
}

/// Serialized form of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub project_id: DbId,
    pub project_name: String,
    pub current_step: u8,
    pub steps: Vec<StepIndicator>,
    pub missing_required: Vec<&'static str>,
    pub draft: Draft,
}

/// Serialized form of the step-2 scene list.
#[derive(Debug, Clone, Serialize)]
pub struct SceneListView {
    pub scenes: Vec<SceneDraft>,
    pub can_remove: bool,
}

/// Replace the session's scene list with the persisted scenes, if any.
///
/// Called whenever the wizard enters step 2. An empty result or a backend
/// failure leaves the list as it is; failures are only logged.
pub async fn reload_scenes(store: &dyn Store, session: &mut WizardSession) -> bool {
    let project_id = session.project_id();
    match store.list_scenes(project_id).await {
        Ok(rows) if !rows.is_empty() => {
            let drafts = rows.iter().map(Scene::to_draft).collect();
            session.replace_scenes(SceneList::from_scenes(drafts));
            tracing::debug!(%project_id, count = rows.len(), "Loaded persisted scenes");
            true
        }
        Ok(_) => false,
        Err(e) => {
            tracing::error!(%project_id, error = %e, "Failed to load persisted scenes");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// All open sessions, keyed by project id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<DbId, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `project`, or resume the one already open.
    ///
    /// Returns the handle and whether a new session was created.
    pub async fn open(&self, project: Project) -> (SharedSession, bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&project.id) {
            return (Arc::clone(existing), false);
        }
        let id = project.id;
        let session = Arc::new(Mutex::new(WizardSession::open(project)));
        sessions.insert(id, Arc::clone(&session));
        (session, true)
    }

    pub async fn get(&self, project_id: DbId) -> Option<SharedSession> {
        self.sessions.read().await.get(&project_id).cloned()
    }

    /// Like [`Self::get`], but a missing session is a `NotFound` error.
    pub async fn require(&self, project_id: DbId) -> Result<SharedSession, CoreError> {
        self.get(project_id).await.ok_or(CoreError::NotFound {
            entity: "WizardSession",
            id: project_id,
        })
    }

    pub async fn close(&self, project_id: DbId) -> Option<SharedSession> {
        self.sessions.write().await.remove(&project_id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
