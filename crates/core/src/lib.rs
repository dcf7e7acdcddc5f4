//! Domain rules for the storyboard wizard.
//!
//! Pure, I/O-free logic shared by the data layer and the HTTP service:
//! project form validation, the three-step wizard state machine, the
//! editable scene list and the image generation vocabulary.

pub mod error;
pub mod generation;
pub mod project;
pub mod scene_list;
pub mod story;
pub mod types;
pub mod wizard;
