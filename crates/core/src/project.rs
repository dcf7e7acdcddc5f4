//! New-project form validation and project display helpers.
//!
//! The form gates on two required fields (`name`, `api_key`); both must be
//! non-blank after trimming. Validation runs before anything touches the
//! backend.

use chrono::Duration;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Timestamps older than this are rendered as absolute dates.
pub const RELATIVE_LABEL_MAX_DAYS: i64 = 7;

/// Absolute date format used for project cards (`19 Oct 2026, 14:05`).
pub const ABSOLUTE_LABEL_FORMAT: &str = "%d %b %Y, %H:%M";

// ---------------------------------------------------------------------------
// New project form
// ---------------------------------------------------------------------------

/// Fields collected by the new-project form.
///
/// Absent fields deserialize as blank so they fail validation instead of
/// being rejected by the JSON extractor.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct NewProjectForm {
    #[validate(custom(function = "not_blank"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub api_key: String,
    pub cookies: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl NewProjectForm {
    /// Validate required fields, naming every blank one in the error.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(|errors| {
            let mut fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|k| k.to_string())
                .collect();
            fields.sort();
            CoreError::Validation(format!("required fields are blank: {}", fields.join(", ")))
        })
    }
}

/// The value every step blob starts with when a project is created.
pub fn empty_step_blob() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

/// Human-readable label for a project's `updated_at`.
///
/// Recent timestamps render relative to `now`; anything older than
/// [`RELATIVE_LABEL_MAX_DAYS`] (or in the future) renders as an absolute
/// date.
pub fn updated_label(updated_at: Timestamp, now: Timestamp) -> String {
    let age = now - updated_at;

    if age < Duration::zero() || age >= Duration::days(RELATIVE_LABEL_MAX_DAYS) {
        return updated_at.format(ABSOLUTE_LABEL_FORMAT).to_string();
    }

    if age < Duration::minutes(1) {
        "just now".to_string()
    } else if age < Duration::hours(1) {
        plural(age.num_minutes(), "minute")
    } else if age < Duration::days(1) {
        plural(age.num_hours(), "hour")
    } else {
        plural(age.num_days(), "day")
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
