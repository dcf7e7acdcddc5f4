//! The three-step storyboard wizard: step definitions, navigation rules,
//! and the draft container the steps write into.
//!
//! Navigation is strictly linear. `next` and `previous` move one step;
//! jumping through the step indicator may revisit any earlier step or
//! advance exactly one step. Finalizing is only possible on the last step.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::project::empty_step_blob;
use crate::scene_list::SceneList;
use crate::story::StoryDetails;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Minimum step number (1-based).
pub const MIN_STEP: u8 = 1;

/// Maximum step number (1-based).
pub const MAX_STEP: u8 = 3;

/// The three steps of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    StoryDetails,
    SceneList,
    ImageGeneration,
}

impl WizardStep {
    pub const ALL: [WizardStep; 3] = [
        WizardStep::StoryDetails,
        WizardStep::SceneList,
        WizardStep::ImageGeneration,
    ];

    /// Convert a 1-based step number to a `WizardStep`.
    pub fn from_number(n: u8) -> Result<Self, CoreError> {
        match n {
            1 => Ok(Self::StoryDetails),
            2 => Ok(Self::SceneList),
            3 => Ok(Self::ImageGeneration),
            _ => Err(CoreError::Validation(format!(
                "Invalid step number {n}. Must be between {MIN_STEP} and {MAX_STEP}"
            ))),
        }
    }

    /// Convert to a 1-based step number.
    pub fn to_number(self) -> u8 {
        match self {
            Self::StoryDetails => 1,
            Self::SceneList => 2,
            Self::ImageGeneration => 3,
        }
    }

    /// Title shown on the step indicator.
    pub fn title(self) -> &'static str {
        match self {
            Self::StoryDetails => "Story Details",
            Self::SceneList => "Scene List",
            Self::ImageGeneration => "Generate Images",
        }
    }
}

/// Whether the step indicator for `target` is clickable from `current`.
///
/// Any step up to and including the current one may be revisited, and the
/// step directly after it may be entered. Everything else is rejected.
pub fn can_navigate_to(current: u8, target: u8) -> bool {
    (MIN_STEP..=MAX_STEP).contains(&target) && (target <= current || target == current + 1)
}

// ---------------------------------------------------------------------------
// Draft
// ---------------------------------------------------------------------------

/// Payload of a single step's change callback.
///
/// Each variant replaces exactly one blob; no step can touch another
/// step's data.
#[derive(Debug, Clone, PartialEq)]
pub enum StepUpdate {
    StoryDetails(StoryDetails),
    SceneList(SceneList),
    ImageGeneration(serde_json::Value),
}

impl StepUpdate {
    pub fn step(&self) -> WizardStep {
        match self {
            Self::StoryDetails(_) => WizardStep::StoryDetails,
            Self::SceneList(_) => WizardStep::SceneList,
            Self::ImageGeneration(_) => WizardStep::ImageGeneration,
        }
    }
}

/// The not-yet-persisted working copy of a project's three step blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub step1_data: serde_json::Value,
    pub step2_data: serde_json::Value,
    pub step3_data: serde_json::Value,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            step1_data: empty_step_blob(),
            step2_data: empty_step_blob(),
            step3_data: empty_step_blob(),
        }
    }
}

impl Draft {
    /// Merge one step's payload into the draft under that step's key.
    pub fn apply(&mut self, update: StepUpdate) {
        match update {
            StepUpdate::StoryDetails(details) => self.step1_data = details.to_blob(),
            StepUpdate::SceneList(list) => self.step2_data = list.to_blob(),
            StepUpdate::ImageGeneration(blob) => self.step3_data = blob,
        }
    }
}

// ---------------------------------------------------------------------------
// Wizard state
// ---------------------------------------------------------------------------

/// Progress indicator for one step, as seen from the current step.
#[derive(Debug, Clone, Serialize)]
pub struct StepIndicator {
    pub number: u8,
    pub title: &'static str,
    pub active: bool,
    pub completed: bool,
    pub reachable: bool,
}

/// Current step plus draft for one open project.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    current: WizardStep,
    draft: Draft,
}

impl WizardState {
    /// Start on step 1 with the project's stored blobs as the draft.
    pub fn new(draft: Draft) -> Self {
        Self {
            current: WizardStep::StoryDetails,
            draft,
        }
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn apply(&mut self, update: StepUpdate) {
        self.draft.apply(update);
    }

    /// Apply an update coming from the user, who must be on its step.
    pub fn submit(&mut self, update: StepUpdate) -> Result<(), CoreError> {
        let step = update.step();
        if step != self.current {
            return Err(CoreError::Validation(format!(
                "Step {} data cannot be changed from step {}",
                step.to_number(),
                self.current.to_number()
            )));
        }
        self.draft.apply(update);
        Ok(())
    }

    /// Move forward one step.
    pub fn next(&mut self) -> Result<WizardStep, CoreError> {
        let current = self.current.to_number();
        if current >= MAX_STEP {
            return Err(CoreError::Validation(
                "Already on the last step; cannot go forward".to_string(),
            ));
        }
        self.current = WizardStep::from_number(current + 1)?;
        Ok(self.current)
    }

    /// Move back one step.
    pub fn previous(&mut self) -> Result<WizardStep, CoreError> {
        let current = self.current.to_number();
        if current <= MIN_STEP {
            return Err(CoreError::Validation(
                "Already on the first step; cannot go back".to_string(),
            ));
        }
        self.current = WizardStep::from_number(current - 1)?;
        Ok(self.current)
    }

    /// Jump to `target` through the step indicator.
    pub fn go_to(&mut self, target: u8) -> Result<WizardStep, CoreError> {
        let current = self.current.to_number();
        if !can_navigate_to(current, target) {
            return Err(CoreError::Validation(format!(
                "Cannot navigate from step {current} to step {target}"
            )));
        }
        self.current = WizardStep::from_number(target)?;
        Ok(self.current)
    }

    /// Check that the draft may be finalized from the current step.
    pub fn ensure_can_finalize(&self) -> Result<(), CoreError> {
        if self.current != WizardStep::ImageGeneration {
            return Err(CoreError::Validation(format!(
                "Cannot finalize: must be on step {MAX_STEP}, currently on step {}",
                self.current.to_number()
            )));
        }
        Ok(())
    }

    /// Indicator state for all three steps.
    pub fn indicators(&self) -> Vec<StepIndicator> {
        let current = self.current.to_number();
        WizardStep::ALL
            .iter()
            .map(|step| {
                let number = step.to_number();
                StepIndicator {
                    number,
                    title: step.title(),
                    active: number == current,
                    completed: number < current,
                    reachable: can_navigate_to(current, number),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
