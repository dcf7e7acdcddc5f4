//! Wizard engine.
//!
//! Server-side wizard sessions, the debounced scene autosave, and the
//! image generation runner used by step 3.

pub mod autosave;
pub mod generator;
pub mod session;
