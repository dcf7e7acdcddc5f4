use std::sync::Arc;

use storyboard_db::store::Store;

use crate::config::ServerConfig;
use crate::engine::autosave::AutosaveScheduler;
use crate::engine::generator::{GenerationRunner, ImageGenerator, PlaceholderGenerator};
use crate::engine::session::SessionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Storage backend (PostgreSQL or in-memory).
    pub store: Arc<dyn Store>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Open wizard sessions, one per project.
    pub sessions: Arc<SessionRegistry>,
    /// Debounced scene autosave.
    pub autosave: Arc<AutosaveScheduler>,
    /// Step-3 image generation.
    pub generation: Arc<GenerationRunner>,
}

impl AppState {
    /// State with the placeholder image generator.
    pub fn new(store: Arc<dyn Store>, config: ServerConfig) -> Self {
        let generator = Arc::new(PlaceholderGenerator::new(config.generation_delay));
        Self::with_generator(store, config, generator)
    }

    pub fn with_generator(
        store: Arc<dyn Store>,
        config: ServerConfig,
        generator: Arc<dyn ImageGenerator>,
    ) -> Self {
        let autosave = AutosaveScheduler::new(Arc::clone(&store), config.autosave_debounce);
        let generation =
            GenerationRunner::new(Arc::clone(&store), generator, config.generation_policy);
        Self {
            store,
            config: Arc::new(config),
            sessions: Arc::new(SessionRegistry::new()),
            autosave: Arc::new(autosave),
            generation: Arc::new(generation),
        }
    }
}
