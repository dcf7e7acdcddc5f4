//! Image generation vocabulary for the third wizard step.
//!
//! The generator itself is a stand-in: it waits for a fixed delay and then
//! returns one placeholder image per scene.

use std::time::Duration;

use serde::Serialize;

use crate::error::CoreError;
use crate::scene_list::{SceneImage, SceneStatus};
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Simulated duration of one generation call.
pub const DEFAULT_GENERATION_DELAY: Duration = Duration::from_secs(2);

/// Base URL of the placeholder image service.
pub const PLACEHOLDER_BASE_URL: &str = "https://placehold.co/800x600/1a1a1a/666666";

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// How "generate all" schedules its scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPolicy {
    /// One scene at a time, in scene order.
    #[default]
    Sequential,
    /// At most `n` scenes in flight at once.
    Bounded(usize),
}

impl GenerationPolicy {
    /// Parse `sequential` or `bounded:N` (N >= 1).
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("sequential") {
            return Ok(Self::Sequential);
        }
        if let Some(n) = s.strip_prefix("bounded:") {
            let n: usize = n.trim().parse().map_err(|_| {
                CoreError::Validation(format!("Invalid concurrency bound in '{s}'"))
            })?;
            if n == 0 {
                return Err(CoreError::Validation(
                    "Concurrency bound must be at least 1".to_string(),
                ));
            }
            return Ok(Self::Bounded(n));
        }
        Err(CoreError::Validation(format!(
            "Invalid generation policy '{s}'. Must be 'sequential' or 'bounded:N'"
        )))
    }

    /// Maximum number of generations running at once.
    pub fn concurrency(self) -> usize {
        match self {
            Self::Sequential => 1,
            Self::Bounded(n) => n,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether "generate all" should pick up a scene in this status.
pub fn needs_generation(status: SceneStatus) -> bool {
    status != SceneStatus::Completed
}

/// Placeholder image standing in for a real generation result.
pub fn placeholder_image(scene_number: i32, id: i64) -> SceneImage {
    SceneImage {
        url: format!("{PLACEHOLDER_BASE_URL}?text=Scene+{scene_number}"),
        id,
    }
}

/// Result of one scene's generation inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneOutcome {
    pub scene_id: DbId,
    pub scene_number: i32,
    pub status: SceneStatus,
}

/// Summary of a "generate all" batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<SceneOutcome>,
    pub skipped: usize,
}

impl BatchReport {
    pub fn completed(&self) -> usize {
        self.count(SceneStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.count(SceneStatus::Error)
    }

    fn count(&self, status: SceneStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
