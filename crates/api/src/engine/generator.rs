//! Image generation for step 3.
//!
//! [`ImageGenerator`] is the seam a real image service would plug into. The
//! shipped implementation, [`PlaceholderGenerator`], waits for a fixed delay
//! and returns one placeholder image per scene.
//!
//! [`GenerationRunner`] drives the scene status through
//! `generating -> completed | error`, keeps the in-flight set, and runs
//! "generate all" batches under the configured [`GenerationPolicy`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use storyboard_core::generation::{
    needs_generation, placeholder_image, BatchReport, GenerationPolicy, SceneOutcome,
};
use storyboard_core::scene_list::{SceneImage, SceneStatus};
use storyboard_core::types::DbId;
use storyboard_db::models::project::Project;
use storyboard_db::models::scene::{Scene, UpdateSceneGeneration};
use storyboard_db::store::{Store, StoreError};

// ---------------------------------------------------------------------------
// Generator seam
// ---------------------------------------------------------------------------

/// Credentials of the owning project, handed to the generator untouched.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub api_key: Option<String>,
    pub cookies: Option<String>,
}

impl GenerationContext {
    pub fn for_project(project: &Project) -> Self {
        Self {
            api_key: project.api_key.clone(),
            cookies: project.cookies.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Scene {0} no longer exists")]
    SceneMissing(DbId),
}

/// Produces images for one scene.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        scene: &Scene,
        ctx: &GenerationContext,
    ) -> Result<Vec<SceneImage>, GenerationError>;
}

/// Stand-in generator: sleeps, then returns a single placeholder image.
pub struct PlaceholderGenerator {
    delay: Duration,
}

impl PlaceholderGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ImageGenerator for PlaceholderGenerator {
    fn name(&self) -> &str {
        "placeholder"
    }

    async fn generate(
        &self,
        scene: &Scene,
        _ctx: &GenerationContext,
    ) -> Result<Vec<SceneImage>, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![placeholder_image(
            scene.scene_number,
            Utc::now().timestamp_millis(),
        )])
    }
}

// ---------------------------------------------------------------------------
// In-flight tracking
// ---------------------------------------------------------------------------

/// Ids of scenes with a generation currently running.
#[derive(Default)]
pub struct InFlight {
    ids: Mutex<HashSet<DbId>>,
}

impl InFlight {
    pub fn contains(&self, id: DbId) -> bool {
        self.ids().contains(&id)
    }

    pub fn snapshot(&self) -> HashSet<DbId> {
        self.ids().clone()
    }

    /// Claim `id` until the returned guard is dropped.
    ///
    /// Returns `None` when the scene is already claimed.
    fn try_track(&self, id: DbId) -> Option<InFlightGuard<'_>> {
        let claimed = self.ids().insert(id);
        claimed.then(|| InFlightGuard { set: self, id })
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<DbId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct InFlightGuard<'a> {
    set: &'a InFlight,
    id: DbId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.ids().remove(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct GenerationRunner {
    store: Arc<dyn Store>,
    generator: Arc<dyn ImageGenerator>,
    policy: GenerationPolicy,
    in_flight: InFlight,
}

impl GenerationRunner {
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<dyn ImageGenerator>,
        policy: GenerationPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            policy,
            in_flight: InFlight::default(),
        }
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Generate images for one scene.
    ///
    /// Returns `None` without touching the scene when it is already in
    /// flight. Otherwise never fails: errors end with the scene in `error`
    /// status and are logged. The scene is in flight for exactly the
    /// duration of the call.
    pub async fn generate(&self, scene: &Scene, ctx: &GenerationContext) -> Option<SceneOutcome> {
        let Some(_guard) = self.in_flight.try_track(scene.id) else {
            tracing::debug!(scene_id = %scene.id, "Scene already generating, not started again");
            return None;
        };

        let status = match self.run(scene, ctx).await {
            Ok(()) => SceneStatus::Completed,
            Err(e) => {
                tracing::error!(
                    scene_id = %scene.id,
                    scene_number = scene.scene_number,
                    generator = self.generator.name(),
                    error = %e,
                    "Image generation failed"
                );
                let mark_failed = UpdateSceneGeneration {
                    status: SceneStatus::Error,
                    images: None,
                };
                if let Err(e) = self.store.update_scene_generation(scene.id, &mark_failed).await {
                    tracing::error!(scene_id = %scene.id, error = %e, "Failed to mark scene as errored");
                }
                SceneStatus::Error
            }
        };

        Some(SceneOutcome {
            scene_id: scene.id,
            scene_number: scene.scene_number,
            status,
        })
    }

    async fn run(&self, scene: &Scene, ctx: &GenerationContext) -> Result<(), GenerationError> {
        let started = UpdateSceneGeneration {
            status: SceneStatus::Generating,
            images: Some(Vec::new()),
        };
        if let Err(e) = self.store.update_scene_generation(scene.id, &started).await {
            tracing::warn!(scene_id = %scene.id, error = %e, "Failed to mark scene as generating");
        }

        let images = self.generator.generate(scene, ctx).await?;

        let finished = UpdateSceneGeneration {
            status: SceneStatus::Completed,
            images: Some(images),
        };
        self.store
            .update_scene_generation(scene.id, &finished)
            .await?
            .ok_or(GenerationError::SceneMissing(scene.id))?;

        tracing::info!(scene_id = %scene.id, scene_number = scene.scene_number, "Scene image generated");
        Ok(())
    }

    /// Generate every scene that is not already completed.
    ///
    /// `scenes` must be ordered by scene number and outcomes keep that
    /// order. Under the sequential policy each scene finishes before the
    /// next starts; a failure never stops the batch. Scenes another run is
    /// already generating count as skipped.
    pub async fn generate_all(&self, scenes: Vec<Scene>, ctx: &GenerationContext) -> BatchReport {
        let total = scenes.len();
        let queued: Vec<Scene> = scenes
            .into_iter()
            .filter(|s| needs_generation(s.status))
            .collect();

        let ran: Vec<Option<SceneOutcome>> = stream::iter(queued)
            .map(move |scene| async move { self.generate(&scene, ctx).await })
            .buffered(self.policy.concurrency())
            .collect()
            .await;
        let outcomes: Vec<SceneOutcome> = ran.into_iter().flatten().collect();

        let report = BatchReport {
            skipped: total - outcomes.len(),
            outcomes,
        };
        tracing::info!(
            completed = report.completed(),
            failed = report.failed(),
            skipped = report.skipped,
            "Generate-all batch finished"
        );
        report
    }

    /// Reset scenes left in `generating` by a run that no longer exists.
    ///
    /// Updates the passed rows in place and returns how many were reset.
    pub async fn reconcile_stuck(&self, scenes: &mut [Scene]) -> usize {
        let in_flight = self.in_flight.snapshot();
        let mut reset = 0;
        for scene in scenes
            .iter_mut()
            .filter(|s| s.status == SceneStatus::Generating && !in_flight.contains(&s.id))
        {
            let update = UpdateSceneGeneration {
                status: SceneStatus::Pending,
                images: None,
            };
            match self.store.update_scene_generation(scene.id, &update).await {
                Ok(Some(row)) => {
                    *scene = row;
                    reset += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(scene_id = %scene.id, error = %e, "Failed to reset stuck scene");
                }
            }
        }
        if reset > 0 {
            tracing::warn!(reset, "Reset scenes stuck in generating");
        }
        reset
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storyboard_core::project::NewProjectForm;
    use storyboard_core::scene_list::SceneDraft;
    use storyboard_db::memory::MemoryStore;
    use storyboard_db::models::project::CreateProject;
    use storyboard_db::models::scene::CreateScene;
    use storyboard_db::store::{ProjectStore, SceneStore};
    use tokio::sync::Notify;

    async fn seed(store: &MemoryStore, count: i32) -> Vec<Scene> {
        let project = store
            .create_project(&CreateProject::from(NewProjectForm {
                name: "Test".into(),
                api_key: "k1".into(),
                ..Default::default()
            }))
            .await
            .unwrap();
        for n in 1..=count {
            store
                .create_scene(&CreateScene::from_draft(project.id, &SceneDraft::blank(n)))
                .await
                .unwrap();
        }
        store.list_scenes(project.id).await.unwrap()
    }

    /// Fails scene numbers in `fail`, records start/end order.
    struct ScriptedGenerator {
        fail: Vec<i32>,
        log: Mutex<Vec<String>>,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new(fail: Vec<i32>) -> Self {
            Self {
                fail,
                log: Mutex::new(Vec::new()),
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            scene: &Scene,
            _ctx: &GenerationContext,
        ) -> Result<Vec<SceneImage>, GenerationError> {
            let n = scene.scene_number;
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.log.lock().unwrap().push(format!("start {n}"));
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.log.lock().unwrap().push(format!("end {n}"));
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail.contains(&n) {
                return Err(GenerationError::Failed(format!("scene {n} exploded")));
            }
            Ok(vec![placeholder_image(n, 1)])
        }
    }

    /// Blocks until released so intermediate state can be observed.
    struct GatedGenerator {
        gate: Notify,
    }

    #[async_trait]
    impl ImageGenerator for GatedGenerator {
        fn name(&self) -> &str {
            "gated"
        }

        async fn generate(
            &self,
            scene: &Scene,
            _ctx: &GenerationContext,
        ) -> Result<Vec<SceneImage>, GenerationError> {
            self.gate.notified().await;
            Ok(vec![placeholder_image(scene.scene_number, 7)])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn placeholder_generator_waits_then_returns_one_image() {
        let store = MemoryStore::new();
        let scene = seed(&store, 1).await.remove(0);
        let generator = PlaceholderGenerator::new(Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        let images = generator
            .generate(&scene, &GenerationContext::default())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(images.len(), 1);
        assert!(images[0].url.ends_with("?text=Scene+1"));
    }

    #[tokio::test]
    async fn generate_moves_through_generating_to_completed() {
        let store = Arc::new(MemoryStore::new());
        let scene = seed(&store, 1).await.remove(0);
        assert_eq!(scene.status, SceneStatus::Pending);

        let generator = Arc::new(GatedGenerator { gate: Notify::new() });
        let runner = Arc::new(GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Sequential,
        ));

        let task = {
            let runner = runner.clone();
            let scene = scene.clone();
            tokio::spawn(async move {
                runner.generate(&scene, &GenerationContext::default()).await
            })
        };

        // Let the task reach the generator.
        let mut mid = store.find_scene(scene.id).await.unwrap().unwrap();
        for _ in 0..100 {
            if mid.status == SceneStatus::Generating {
                break;
            }
            tokio::task::yield_now().await;
            mid = store.find_scene(scene.id).await.unwrap().unwrap();
        }
        assert_eq!(mid.status, SceneStatus::Generating);
        assert!(runner.in_flight().contains(scene.id));
        assert!(mid.images.is_empty());

        generator.gate.notify_one();
        let outcome = task.await.unwrap().unwrap();
        assert_eq!(outcome.status, SceneStatus::Completed);

        let done = store.find_scene(scene.id).await.unwrap().unwrap();
        assert_eq!(done.status, SceneStatus::Completed);
        assert_eq!(done.images.len(), 1);
        assert!(!runner.in_flight().contains(scene.id));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_marks_error_and_clears_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let scene = seed(&store, 1).await.remove(0);
        let runner = GenerationRunner::new(
            store.clone(),
            Arc::new(ScriptedGenerator::new(vec![1])),
            GenerationPolicy::Sequential,
        );

        let outcome = runner
            .generate(&scene, &GenerationContext::default())
            .await
            .unwrap();
        assert_eq!(outcome.status, SceneStatus::Error);
        let row = store.find_scene(scene.id).await.unwrap().unwrap();
        assert_eq!(row.status, SceneStatus::Error);
        assert!(!runner.in_flight().contains(scene.id));
    }

    #[tokio::test(start_paused = true)]
    async fn generate_all_is_sequential_and_survives_failures() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 3).await;
        let generator = Arc::new(ScriptedGenerator::new(vec![2]));
        let runner = GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Sequential,
        );

        let report = runner
            .generate_all(scenes.clone(), &GenerationContext::default())
            .await;

        let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![SceneStatus::Completed, SceneStatus::Error, SceneStatus::Completed]
        );
        assert_eq!(
            generator.log(),
            vec!["start 1", "end 1", "start 2", "end 2", "start 3", "end 3"]
        );
        assert_eq!(generator.peak.load(Ordering::SeqCst), 1);
        assert!(runner.in_flight().snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn generate_all_skips_completed_scenes() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 2).await;
        store
            .update_scene_generation(
                scenes[0].id,
                &UpdateSceneGeneration {
                    status: SceneStatus::Completed,
                    images: Some(vec![placeholder_image(1, 1)]),
                },
            )
            .await
            .unwrap();
        let scenes = store.list_scenes(scenes[0].project_id).await.unwrap();

        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let runner = GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Sequential,
        );
        let report = runner
            .generate_all(scenes, &GenerationContext::default())
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].scene_number, 2);
        assert_eq!(generator.log(), vec!["start 2", "end 2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_caps_concurrency() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 5).await;
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let runner = GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Bounded(2),
        );

        let report = runner
            .generate_all(scenes, &GenerationContext::default())
            .await;

        assert_eq!(report.completed(), 5);
        assert_eq!(generator.peak.load(Ordering::SeqCst), 2);
        let numbers: Vec<_> = report.outcomes.iter().map(|o| o.scene_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn second_generate_of_running_scene_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let scene = seed(&store, 1).await.remove(0);
        let generator = Arc::new(GatedGenerator { gate: Notify::new() });
        let runner = Arc::new(GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Sequential,
        ));

        let task = {
            let runner = runner.clone();
            let scene = scene.clone();
            tokio::spawn(async move {
                runner.generate(&scene, &GenerationContext::default()).await
            })
        };
        for _ in 0..100 {
            if runner.in_flight().contains(scene.id) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(runner.in_flight().contains(scene.id));

        let second = runner.generate(&scene, &GenerationContext::default()).await;
        assert!(second.is_none());
        // The refused call must not release the running claim.
        assert!(runner.in_flight().contains(scene.id));

        generator.gate.notify_one();
        assert_eq!(task.await.unwrap().unwrap().status, SceneStatus::Completed);
        assert!(!runner.in_flight().contains(scene.id));
    }

    #[tokio::test(start_paused = true)]
    async fn generate_all_skips_scene_already_in_flight() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 2).await;
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let runner = GenerationRunner::new(
            store.clone(),
            generator.clone(),
            GenerationPolicy::Sequential,
        );
        let _running = runner.in_flight().try_track(scenes[0].id).unwrap();

        let report = runner
            .generate_all(scenes.clone(), &GenerationContext::default())
            .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].scene_id, scenes[1].id);
        assert_eq!(generator.log(), vec!["start 2", "end 2"]);
        assert!(runner.in_flight().contains(scenes[0].id));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_batch_runs_on_a_spawned_task() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 3).await;
        let project_id = scenes[0].project_id;
        let runner = Arc::new(GenerationRunner::new(
            store.clone(),
            Arc::new(ScriptedGenerator::new(vec![])),
            GenerationPolicy::Bounded(2),
        ));

        let ctx = GenerationContext::default();
        let batch = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.generate_all(scenes, &ctx).await })
        };
        let report = batch.await.unwrap();

        assert_eq!(report.completed(), 3);
        let rows = store.list_scenes(project_id).await.unwrap();
        assert!(rows.iter().all(|s| s.status == SceneStatus::Completed));
    }

    #[tokio::test]
    async fn reconcile_resets_only_abandoned_scenes() {
        let store = Arc::new(MemoryStore::new());
        let scenes = seed(&store, 2).await;
        for scene in &scenes {
            store
                .update_scene_generation(
                    scene.id,
                    &UpdateSceneGeneration {
                        status: SceneStatus::Generating,
                        images: Some(Vec::new()),
                    },
                )
                .await
                .unwrap();
        }
        let mut rows = store.list_scenes(scenes[0].project_id).await.unwrap();

        let runner = GenerationRunner::new(
            store.clone(),
            Arc::new(PlaceholderGenerator::new(Duration::ZERO)),
            GenerationPolicy::Sequential,
        );
        let _running = runner.in_flight().try_track(rows[1].id).unwrap();

        assert_eq!(runner.reconcile_stuck(&mut rows).await, 1);
        assert_eq!(rows[0].status, SceneStatus::Pending);
        assert_eq!(rows[1].status, SceneStatus::Generating);
    }
}
