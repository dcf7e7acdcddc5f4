//! Debounced autosave of the step-2 scene list.
//!
//! Every scene edit (re)starts a per-project timer. When the timer runs out
//! without another edit, the session's scenes are written to the backend one
//! by one in list order: scenes without an id are inserted and get the new
//! id written back into the session, the rest are updated in place. Nothing
//! is batched or transactional; a failing scene is logged and skipped.
//!
//! A pending save can also be flushed immediately, which the wizard does
//! when the user leaves step 2 and the binary does on shutdown. A flush
//! also waits out a pass whose timer already fired, so the caller always
//! sees the ids that pass assigns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use storyboard_core::types::DbId;
use storyboard_db::models::scene::{CreateScene, UpdateScene};
use storyboard_db::store::Store;
use tokio_util::sync::CancellationToken;

use crate::engine::session::SharedSession;

/// Counts from one completed save pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

struct PendingSave {
    ticket: u64,
    cancel: CancellationToken,
    session: SharedSession,
}

/// Owns the per-project debounce timers.
pub struct AutosaveScheduler {
    store: Arc<dyn Store>,
    debounce: Duration,
    pending: Mutex<HashMap<DbId, PendingSave>>,
    next_ticket: AtomicU64,
    /// Serializes save passes so a second pass sees ids assigned by the first.
    /// A fired timer holds it from claiming its slot until its pass ends.
    save_lock: tokio::sync::Mutex<()>,
}

impl AutosaveScheduler {
    pub fn new(store: Arc<dyn Store>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            pending: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// (Re)start the debounce timer for a project.
    pub fn schedule(self: &Arc<Self>, project_id: DbId, session: SharedSession) {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        let previous = self.pending().insert(
            project_id,
            PendingSave {
                ticket,
                cancel: cancel.clone(),
                session: Arc::clone(&session),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(this.debounce) => {}
            }
            let _serial = this.save_lock.lock().await;
            if !this.take_if_current(project_id, ticket) {
                return;
            }
            this.save_serialized(project_id, &session).await;
        });
    }

    /// Whether a timer is currently running for the project.
    pub fn is_pending(&self, project_id: DbId) -> bool {
        self.pending().contains_key(&project_id)
    }

    /// Run a pending save right away.
    ///
    /// Returns `false` when nothing was pending. A pass already under way is
    /// waited for either way.
    pub async fn flush(&self, project_id: DbId) -> bool {
        let entry = self.pending().remove(&project_id);
        match entry {
            Some(entry) => {
                entry.cancel.cancel();
                self.save(project_id, &entry.session).await;
                true
            }
            None => {
                drop(self.save_lock.lock().await);
                false
            }
        }
    }

    /// Flush every pending save and wait for running passes. Used on shutdown.
    pub async fn flush_all(&self) -> usize {
        let ids: Vec<DbId> = self.pending().keys().copied().collect();
        let mut flushed = 0;
        for id in ids {
            if self.flush(id).await {
                flushed += 1;
            }
        }
        drop(self.save_lock.lock().await);
        flushed
    }

    /// Write the session's scenes to the backend.
    ///
    /// Returns `None` when no scene has any content yet, in which case
    /// nothing is written.
    pub async fn save(&self, project_id: DbId, session: &SharedSession) -> Option<SaveSummary> {
        let _serial = self.save_lock.lock().await;
        self.save_serialized(project_id, session).await
    }

    /// Body of [`save`](Self::save); the caller holds `save_lock`.
    async fn save_serialized(
        &self,
        project_id: DbId,
        session: &SharedSession,
    ) -> Option<SaveSummary> {
        let scenes = {
            let session = session.lock().await;
            if !session.scenes().has_content() {
                tracing::debug!(%project_id, "Autosave skipped: no scene content");
                return None;
            }
            session.scenes().scenes().to_vec()
        };

        let mut summary = SaveSummary::default();
        for (index, draft) in scenes.iter().enumerate() {
            match draft.id {
                Some(id) => match self.store.update_scene(id, &UpdateScene::from(draft)).await {
                    Ok(Some(_)) => summary.updated += 1,
                    Ok(None) => {
                        tracing::warn!(%project_id, scene_id = %id, "Autosave: scene row is gone");
                        summary.failed += 1;
                    }
                    Err(e) => {
                        tracing::error!(%project_id, scene_id = %id, error = %e, "Autosave: update failed");
                        summary.failed += 1;
                    }
                },
                None => match self
                    .store
                    .create_scene(&CreateScene::from_draft(project_id, draft))
                    .await
                {
                    Ok(row) => {
                        summary.inserted += 1;
                        let assigned = session
                            .lock()
                            .await
                            .assign_scene_id(index, draft.scene_number, row.id);
                        if !assigned {
                            tracing::warn!(
                                %project_id,
                                scene_id = %row.id,
                                scene_number = draft.scene_number,
                                "Autosave: list changed during insert, id not recorded"
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            %project_id,
                            scene_number = draft.scene_number,
                            error = %e,
                            "Autosave: insert failed"
                        );
                        summary.failed += 1;
                    }
                },
            }
        }

        tracing::info!(
            %project_id,
            inserted = summary.inserted,
            updated = summary.updated,
            failed = summary.failed,
            "Scenes autosaved"
        );
        Some(summary)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<DbId, PendingSave>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the pending slot if it still belongs to `ticket`.
    fn take_if_current(&self, project_id: DbId, ticket: u64) -> bool {
        let mut pending = self.pending();
        match pending.get(&project_id) {
            Some(entry) if entry.ticket == ticket => {
                pending.remove(&project_id);
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
