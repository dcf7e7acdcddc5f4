//! Scene vocabulary and the editable scene list of the second wizard step.
//!
//! The list keeps `scene_number` dense: scene `i` (0-based) always carries
//! number `i + 1`. Removal renumbers the whole list, and the last remaining
//! scene can never be removed.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Scene status
// ---------------------------------------------------------------------------

/// Generation status of a persisted scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
    Pending,
    Generating,
    Completed,
    Error,
}

impl SceneStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "generating" => Ok(Self::Generating),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(CoreError::Validation(format!(
                "Invalid scene status '{s}'. Must be one of: pending, generating, completed, error"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl TryFrom<String> for SceneStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, CoreError> {
        Self::from_str_db(&value)
    }
}

/// One generated image attached to a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneImage {
    pub url: String,
    pub id: i64,
}

// ---------------------------------------------------------------------------
// Scene drafts
// ---------------------------------------------------------------------------

/// Editable field of a scene draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneField {
    Title,
    Description,
}

/// In-memory scene as edited in step 2.
///
/// `id` is `None` until the scene has been inserted by an autosave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub scene_number: i32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl SceneDraft {
    /// A blank, never-persisted scene with the given number.
    pub fn blank(scene_number: i32) -> Self {
        Self {
            id: None,
            scene_number,
            title: String::new(),
            description: String::new(),
        }
    }

    /// Whether the user has typed anything into this scene.
    pub fn has_content(&self) -> bool {
        !self.title.is_empty() || !self.description.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Scene list
// ---------------------------------------------------------------------------

/// JSON key holding the scene array inside the step-2 blob.
pub const STEP_DATA_KEY_SCENES: &str = "scenes";

/// Ordered, editable list of scene drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneList {
    scenes: Vec<SceneDraft>,
}

impl Default for SceneList {
    fn default() -> Self {
        Self {
            scenes: vec![SceneDraft::blank(1)],
        }
    }
}

impl SceneList {
    /// Seed the list from a step-2 blob.
    ///
    /// Uses `blob.scenes` when it is a non-empty, well-formed array and falls
    /// back to a single blank scene otherwise. Numbers are normalized to
    /// 1..N in array order.
    pub fn from_blob(blob: &serde_json::Value) -> Self {
        let parsed = blob
            .get(STEP_DATA_KEY_SCENES)
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<SceneDraft>>(v).ok())
            .unwrap_or_default();
        Self::from_scenes(parsed)
    }

    /// Build a list from already-ordered scenes, renumbering them 1..N.
    ///
    /// An empty input yields the single-blank-scene seed.
    pub fn from_scenes(scenes: Vec<SceneDraft>) -> Self {
        if scenes.is_empty() {
            return Self::default();
        }
        let mut list = Self { scenes };
        list.renumber();
        list
    }

    /// The step-2 blob for the current list.
    pub fn to_blob(&self) -> serde_json::Value {
        let mut blob = serde_json::Map::new();
        blob.insert(
            STEP_DATA_KEY_SCENES.to_string(),
            serde_json::to_value(&self.scenes).unwrap_or_default(),
        );
        serde_json::Value::Object(blob)
    }

    pub fn scenes(&self) -> &[SceneDraft] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SceneDraft> {
        self.scenes.get(index)
    }

    /// Whether removal is currently allowed at all.
    pub fn can_remove(&self) -> bool {
        self.scenes.len() > 1
    }

    /// Whether any scene carries user content (the autosave gate).
    pub fn has_content(&self) -> bool {
        self.scenes.iter().any(SceneDraft::has_content)
    }

    /// Append a blank scene numbered `len + 1` and return its index.
    pub fn add(&mut self) -> usize {
        let number = self.scenes.len() as i32 + 1;
        self.scenes.push(SceneDraft::blank(number));
        self.scenes.len() - 1
    }

    /// Remove the scene at `index` and renumber the rest.
    ///
    /// Returns the removed draft so the caller can delete its persisted row.
    pub fn remove(&mut self, index: usize) -> Result<SceneDraft, CoreError> {
        if !self.can_remove() {
            return Err(CoreError::Validation(
                "Cannot remove the only remaining scene".to_string(),
            ));
        }
        self.check_index(index)?;
        let removed = self.scenes.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Replace one text field of the scene at `index`.
    pub fn update_field(
        &mut self,
        index: usize,
        field: SceneField,
        value: String,
    ) -> Result<&SceneDraft, CoreError> {
        self.check_index(index)?;
        let scene = &mut self.scenes[index];
        match field {
            SceneField::Title => scene.title = value,
            SceneField::Description => scene.description = value,
        }
        Ok(&self.scenes[index])
    }

    /// Record the id assigned by the backend to the scene at `index`.
    ///
    /// Ignored when the slot is gone or already carries an id, which happens
    /// when the list was edited while the insert was in flight.
    pub fn assign_id(&mut self, index: usize, scene_number: i32, id: DbId) -> bool {
        match self.scenes.get_mut(index) {
            Some(scene) if scene.id.is_none() && scene.scene_number == scene_number => {
                scene.id = Some(id);
                true
            }
            _ => false,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), CoreError> {
        if index >= self.scenes.len() {
            return Err(CoreError::Validation(format!(
                "Scene index {index} is out of range (list has {} scenes)",
                self.scenes.len()
            )));
        }
        Ok(())
    }

    fn renumber(&mut self) {
        for (i, scene) in self.scenes.iter_mut().enumerate() {
            scene.scene_number = i as i32 + 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
