//! Story details captured by the first wizard step.

use serde::{Deserialize, Serialize};

/// Narrative metadata for a storyboard.
///
/// Stored verbatim as the step-1 blob. Fields missing from a stored blob
/// read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryDetails {
    pub title: String,
    pub synopsis: String,
    pub genre: String,
    pub duration: String,
    pub characters: String,
    pub setting: String,
    pub tone: String,
}

impl StoryDetails {
    /// Read story details out of an opaque step blob.
    ///
    /// Anything that is not an object, or whose fields are not strings,
    /// falls back to the defaults field by field.
    pub fn from_blob(blob: &serde_json::Value) -> Self {
        let field = |key: &str| {
            blob.get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Self {
            title: field("title"),
            synopsis: field("synopsis"),
            genre: field("genre"),
            duration: field("duration"),
            characters: field("characters"),
            setting: field("setting"),
            tone: field("tone"),
        }
    }

    /// The full field set as a step blob.
    pub fn to_blob(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "synopsis": self.synopsis,
            "genre": self.genre,
            "duration": self.duration,
            "characters": self.characters,
            "setting": self.setting,
            "tone": self.tone,
        })
    }

    /// Fields marked as required in the form that are still blank.
    ///
    /// Informational only; nothing blocks on this.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("genre", &self.genre),
            ("synopsis", &self.synopsis),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}
