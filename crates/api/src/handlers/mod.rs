pub mod generation;
pub mod project;
pub mod scene_list;
pub mod wizard;
