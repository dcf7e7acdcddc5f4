//! Row models and DTOs, one module per table.

pub mod project;
pub mod scene;
