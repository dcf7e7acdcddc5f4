//! Project entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use storyboard_core::project::{empty_step_blob, NewProjectForm};
use storyboard_core::types::{DbId, Timestamp};
use storyboard_core::wizard::Draft;

/// A project row from the `projects` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub api_key: Option<String>,
    pub cookies: Option<String>,
    pub step1_data: serde_json::Value,
    pub step2_data: serde_json::Value,
    pub step3_data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    /// The stored step blobs as a wizard draft.
    pub fn draft(&self) -> Draft {
        Draft {
            step1_data: self.step1_data.clone(),
            step2_data: self.step2_data.clone(),
            step3_data: self.step3_data.clone(),
        }
    }
}

/// DTO for inserting a new project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub api_key: Option<String>,
    pub cookies: Option<String>,
    pub step1_data: serde_json::Value,
    pub step2_data: serde_json::Value,
    pub step3_data: serde_json::Value,
}

impl From<NewProjectForm> for CreateProject {
    /// Package a validated form; every step blob starts empty.
    fn from(form: NewProjectForm) -> Self {
        Self {
            name: form.name,
            description: form.description,
            api_key: Some(form.api_key),
            cookies: form.cookies,
            step1_data: empty_step_blob(),
            step2_data: empty_step_blob(),
            step3_data: empty_step_blob(),
        }
    }
}

/// DTO for the wizard's finalize write: all three blobs at once.
#[derive(Debug, Clone)]
pub struct UpdateProjectSteps {
    pub step1_data: serde_json::Value,
    pub step2_data: serde_json::Value,
    pub step3_data: serde_json::Value,
    pub updated_at: Timestamp,
}

impl UpdateProjectSteps {
    pub fn from_draft(draft: &Draft, updated_at: Timestamp) -> Self {
        Self {
            step1_data: draft.step1_data.clone(),
            step2_data: draft.step2_data.clone(),
            step3_data: draft.step3_data.clone(),
            updated_at,
        }
    }
}
