//! Sync coordinator: reconcile state machine and optimistic mutations.
//!
//! ## Reconcile
//!
//! ```text
//! IDLE --request--> SYNCING --success--> IDLE   (put_all + last_sync_at)
//!                           --failure--> IDLE   (replica untouched)
//! ```
//!
//! A request that arrives while SYNCING, or less than `min_interval` after
//! the previous attempt *started*, is answered with the local snapshot and
//! dropped. A failed attempt still consumes the interval.
//!
//! ## Mutations
//!
//! Toggle, edit and delete write the replica first and return a [`Push`]
//! handle for the remote call running in the background. Dropping the handle
//! detaches the push; it is never cancelled or retried. Create is the
//! exception: the remote store assigns ids, so it is awaited end to end and
//! mirrored locally only after the insert succeeds.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use wardrobe_core::types::sort_newest_first;
use wardrobe_core::{
    Attributes, ImageRef, ItemDraft, ItemId, ItemPatch, ItemRecord, LocalReplicaStore, NewItem,
    ReplicaError, SyncAttempt,
};
use wardrobe_remote::{BlobStore, Classifier, RemoteCatalog};

use crate::error::{CreateError, SyncError};

pub use wardrobe_core::ReconcileStatus;

/// Minimum spacing between reconcile attempts.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Background remote push started by a mutation.
pub type Push = JoinHandle<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Syncing,
}

/// Result of a reconcile request: the items the caller should display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub status: ReconcileStatus,
    pub items: Vec<ItemRecord>,
}

impl ReconcileOutcome {
    /// `true` only when `items` is a fresh remote snapshot.
    pub fn success(&self) -> bool {
        self.status == ReconcileStatus::Synced
    }
}

/// Point-in-time view of sync health for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_sync_at: Option<DateTime<Utc>>,
    /// Outcome of the most recent attempt that reached the remote store,
    /// including attempts made by earlier processes.
    pub last_outcome: Option<ReconcileStatus>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub cached_items: usize,
    pub local_available: bool,
}

#[derive(Debug)]
struct SyncState {
    phase: SyncPhase,
    last_attempt: Option<Instant>,
    last_outcome: Option<ReconcileStatus>,
}

/// Marks the coordinator SYNCING for as long as it lives.
struct SyncingGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl SyncingGuard<'_> {
    fn record(&self, status: ReconcileStatus) {
        lock(self.state).last_outcome = Some(status);
    }
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).phase = SyncPhase::Idle;
    }
}

fn lock(state: &Mutex<SyncState>) -> MutexGuard<'_, SyncState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owns the replica, the remote collaborators and the reconcile state.
///
/// Every instance has its own state; two coordinators never share a rate
/// limiter or SYNCING flag.
pub struct SyncCoordinator {
    replica: Arc<LocalReplicaStore>,
    remote: Arc<dyn RemoteCatalog>,
    blobs: Arc<dyn BlobStore>,
    classifier: Option<Arc<dyn Classifier>>,
    min_interval: Duration,
    state: Mutex<SyncState>,
}

impl SyncCoordinator {
    pub fn new(
        replica: Arc<LocalReplicaStore>,
        remote: Arc<dyn RemoteCatalog>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            replica,
            remote,
            blobs,
            classifier: None,
            min_interval: MIN_SYNC_INTERVAL,
            state: Mutex::new(SyncState {
                phase: SyncPhase::Idle,
                last_attempt: None,
                last_outcome: None,
            }),
        }
    }

    /// Tag new photos with `classifier` before upload.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn replica(&self) -> &Arc<LocalReplicaStore> {
        &self.replica
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn phase(&self) -> SyncPhase {
        lock(&self.state).phase
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current replica contents, newest first. Empty if local storage is
    /// unavailable.
    pub async fn local_snapshot(&self) -> Vec<ItemRecord> {
        match self.with_replica(|r| r.get_all()).await {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(error = %err, "local replica unavailable, serving remote data only");
                Vec::new()
            }
        }
    }

    /// Full pull: replace the replica with the remote item set.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let guard = match self.try_begin() {
            Ok(guard) => guard,
            Err(status) => {
                tracing::debug!(?status, "reconcile skipped");
                return ReconcileOutcome {
                    status,
                    items: self.local_snapshot().await,
                };
            }
        };

        let started = Instant::now();
        let outcome = match self.remote.list_all().await {
            Ok(mut items) => {
                sort_newest_first(&mut items);
                self.commit_snapshot(&items).await;
                tracing::info!(
                    items = items.len(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "reconcile committed remote snapshot",
                );
                ReconcileOutcome {
                    status: ReconcileStatus::Synced,
                    items,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "reconcile failed, keeping local snapshot");
                ReconcileOutcome {
                    status: ReconcileStatus::Failed,
                    items: self.local_snapshot().await,
                }
            }
        };

        guard.record(outcome.status);
        self.persist_attempt(outcome.status).await;
        outcome
    }

    /// Cache-first read.
    ///
    /// A non-empty replica is handed to `on_local` straight away. One
    /// reconcile follows; its items go to `on_remote` when it succeeded, or
    /// whenever the replica was empty so a first run never settles on a
    /// false empty state. Each callback fires at most once.
    pub async fn load<L, R>(&self, on_local: L, on_remote: R) -> ReconcileOutcome
    where
        L: FnOnce(Vec<ItemRecord>),
        R: FnOnce(Vec<ItemRecord>),
    {
        let local = self.local_snapshot().await;
        let local_was_empty = local.is_empty();
        if !local_was_empty {
            on_local(local);
        }

        let outcome = self.reconcile().await;
        if outcome.success() || local_was_empty {
            on_remote(outcome.items.clone());
        }
        outcome
    }

    pub async fn sync_status(&self) -> SyncStatus {
        let (phase, live_outcome) = {
            let state = lock(&self.state);
            (state.phase, state.last_outcome)
        };
        let local = self
            .with_replica(|r| {
                let attempt = r.last_attempt().unwrap_or_default();
                Ok((r.last_sync()?, r.get_all()?.len(), attempt))
            })
            .await;
        let (last_sync_at, cached_items, attempt, local_available) = match local {
            Ok((last_sync_at, count, attempt)) => (last_sync_at, count, attempt, true),
            Err(err) => {
                tracing::warn!(error = %err, "local replica unavailable while reading status");
                (None, 0, None, false)
            }
        };
        SyncStatus {
            phase,
            last_sync_at,
            last_outcome: live_outcome.or(attempt.map(|a| a.outcome)),
            last_attempt_at: attempt.map(|a| a.at),
            cached_items,
            local_available,
        }
    }

    // -----------------------------------------------------------------------
    // Optimistic mutations
    // -----------------------------------------------------------------------

    /// Flip `is_clean` locally, then push the new value.
    ///
    /// Returns `None` without touching the remote store when the item is not
    /// cached.
    pub async fn toggle_cleanliness(&self, id: &ItemId) -> Option<Push> {
        let target = id.clone();
        let updated = self
            .with_replica(move |r| {
                r.update_one(&target, |current| ItemPatch::cleanliness(!current.is_clean))
            })
            .await;

        match updated {
            Ok(Some(item)) => Some(self.push_update(item.id, ItemPatch::cleanliness(item.is_clean))),
            Ok(None) => {
                tracing::debug!(item_id = %id, "toggle ignored, item not cached");
                None
            }
            Err(err) => {
                tracing::warn!(item_id = %id, error = %err, "toggle skipped, local replica unavailable");
                None
            }
        }
    }

    /// Replace the tag map locally, then push it.
    ///
    /// An uncached item is left alone; if local storage is unavailable the
    /// edit still goes to the remote store.
    pub async fn update_attributes(&self, id: &ItemId, attributes: Attributes) -> Option<Push> {
        let patch = ItemPatch::attributes(attributes);
        let target = id.clone();
        let local_patch = patch.clone();
        let updated = self
            .with_replica(move |r| r.update_one(&target, move |_| local_patch))
            .await;

        match updated {
            Ok(Some(_)) => Some(self.push_update(id.clone(), patch)),
            Ok(None) => {
                tracing::debug!(item_id = %id, "edit ignored, item not cached");
                None
            }
            Err(err) => {
                tracing::warn!(item_id = %id, error = %err, "local replica unavailable, pushing edit remotely only");
                Some(self.push_update(id.clone(), patch))
            }
        }
    }

    /// Remove locally, then delete the row and its photo in the background.
    pub async fn delete_item(&self, id: &ItemId, image: Option<&ImageRef>) -> Push {
        self.remove_local(id).await;

        let remote = self.remote.clone();
        let blobs = self.blobs.clone();
        let id = id.clone();
        let blob = image.and_then(|i| i.blob_name()).map(str::to_owned);
        tokio::spawn(async move {
            push_delete(remote.as_ref(), blobs.as_ref(), &id, blob.as_deref()).await;
        })
    }

    /// Remove every target locally, then delete them remotely one at a time.
    ///
    /// Remote failures are logged; the next successful reconcile brings back
    /// any item whose delete did not land.
    pub async fn delete_many(&self, targets: Vec<(ItemId, Option<ImageRef>)>) -> Push {
        for (id, _) in &targets {
            self.remove_local(id).await;
        }

        let remote = self.remote.clone();
        let blobs = self.blobs.clone();
        tokio::spawn(async move {
            let total = targets.len();
            let mut failed = Vec::new();
            for (id, image) in targets {
                let blob = image.as_ref().and_then(ImageRef::blob_name);
                if !push_delete(remote.as_ref(), blobs.as_ref(), &id, blob).await {
                    failed.push(id.0);
                }
            }
            if failed.is_empty() {
                tracing::info!(total, "batch delete confirmed remotely");
            } else {
                tracing::warn!(
                    total,
                    failed = failed.len(),
                    ids = ?failed,
                    "batch delete partially failed; next reconcile restores survivors",
                );
            }
        })
    }

    // -----------------------------------------------------------------------
    // Create (remote first)
    // -----------------------------------------------------------------------

    /// Classify, upload, insert, then mirror the stored record locally.
    pub async fn create_item(
        &self,
        draft: ItemDraft,
        bytes: Vec<u8>,
    ) -> Result<ItemRecord, CreateError> {
        let ItemDraft {
            attributes: supplied,
            is_clean,
            content_type,
        } = draft;

        let mut attributes = match &self.classifier {
            Some(classifier) => classifier
                .classify(&bytes, &content_type)
                .await
                .map_err(CreateError::Classify)?,
            None => Attributes::new(),
        };
        attributes.extend(supplied);

        let name = blob_name_for(&content_type);
        let image_ref = self
            .blobs
            .upload(&name, bytes, &content_type)
            .await
            .map_err(CreateError::Upload)?;

        let new_item = NewItem {
            image_ref,
            attributes,
            is_clean,
        };
        let stored = match self.remote.insert(&new_item).await {
            Ok(stored) => stored,
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(&name).await {
                    tracing::warn!(blob = %name, error = %cleanup, "orphaned photo after failed insert");
                }
                return Err(CreateError::Insert(err));
            }
        };

        let mirror = stored.clone();
        if let Err(err) = self.with_replica(move |r| r.put_one(&mirror)).await {
            tracing::warn!(item_id = %stored.id, error = %err, "created item not cached locally");
        }
        tracing::info!(item_id = %stored.id, "item created");
        Ok(stored)
    }

    /// Drop all cached items and the sync timestamp.
    pub async fn clear_local(&self) -> bool {
        match self.with_replica(|r| r.clear()).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "failed to clear local replica");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn try_begin(&self) -> Result<SyncingGuard<'_>, ReconcileStatus> {
        let mut state = lock(&self.state);
        if state.phase == SyncPhase::Syncing {
            return Err(ReconcileStatus::InFlight);
        }
        let now = Instant::now();
        if let Some(last) = state.last_attempt {
            if now.duration_since(last) < self.min_interval {
                return Err(ReconcileStatus::RateLimited);
            }
        }
        state.phase = SyncPhase::Syncing;
        state.last_attempt = Some(now);
        Ok(SyncingGuard { state: &self.state })
    }

    async fn persist_attempt(&self, outcome: ReconcileStatus) {
        let attempt = SyncAttempt {
            at: Utc::now(),
            outcome,
        };
        if let Err(err) = self.with_replica(move |r| r.record_attempt(&attempt)).await {
            tracing::warn!(error = %err, "could not record reconcile attempt");
        }
    }

    async fn commit_snapshot(&self, items: &[ItemRecord]) {
        let snapshot = items.to_vec();
        if let Err(err) = self.with_replica(move |r| r.put_all(&snapshot)).await {
            tracing::warn!(error = %err, "remote snapshot not cached locally");
            return;
        }
        let now = Utc::now();
        if let Err(err) = self.with_replica(move |r| r.set_last_sync(now)).await {
            tracing::warn!(error = %err, "failed to record last sync time");
        }
    }

    async fn remove_local(&self, id: &ItemId) {
        let target = id.clone();
        if let Err(err) = self.with_replica(move |r| r.remove_one(&target)).await {
            tracing::warn!(item_id = %id, error = %err, "local remove failed");
        }
    }

    fn push_update(&self, id: ItemId, patch: ItemPatch) -> Push {
        let remote = self.remote.clone();
        tokio::spawn(async move {
            match remote.update_fields(&id, &patch).await {
                Ok(()) => tracing::debug!(item_id = %id, "remote update confirmed"),
                Err(err) => tracing::warn!(
                    item_id = %id,
                    error = %err,
                    "remote update failed; next reconcile restores server state",
                ),
            }
        })
    }

    /// Run a replica operation on the blocking pool.
    async fn with_replica<T, F>(&self, op: F) -> Result<T, SyncError>
    where
        F: FnOnce(&LocalReplicaStore) -> Result<T, ReplicaError> + Send + 'static,
        T: Send + 'static,
    {
        let replica = self.replica.clone();
        tokio::task::spawn_blocking(move || op(&replica))
            .await
            .map_err(|err| SyncError::Task(err.to_string()))?
            .map_err(SyncError::from)
    }
}

/// Delete a row and its photo concurrently. Returns `true` if both landed.
async fn push_delete(
    remote: &dyn RemoteCatalog,
    blobs: &dyn BlobStore,
    id: &ItemId,
    blob: Option<&str>,
) -> bool {
    let row = remote.delete_by_id(id);
    let photo = async {
        match blob {
            Some(name) => blobs.remove(name).await,
            None => Ok(()),
        }
    };
    let (row, photo) = tokio::join!(row, photo);

    if let Err(err) = &row {
        tracing::warn!(item_id = %id, error = %err, "remote delete failed");
    }
    if let Err(err) = &photo {
        tracing::warn!(item_id = %id, blob = ?blob, error = %err, "photo delete failed");
    }
    row.is_ok() && photo.is_ok()
}

/// Fresh object name for an uploaded photo.
fn blob_name_for(content_type: &str) -> String {
    let ext = match content_type.strip_prefix("image/") {
        Some("jpeg") | Some("jpg") => "jpg",
        Some("png") => "png",
        Some("webp") => "webp",
        Some("gif") => "gif",
        Some("heic") | Some("heif") => "heic",
        _ => "bin",
    };
    format!("{}.{ext}", uuid::Uuid::new_v4())
}
