//! In-memory collaborators with call recording, failure injection and a push
//! gate.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::Semaphore;

use wardrobe_core::{
    AttributeValue, Attributes, ImageRef, ItemId, ItemPatch, ItemRecord, LocalReplicaStore,
    NewItem, OutfitSuggestion,
};
use wardrobe_remote::{BlobStore, Classifier, RemoteCatalog, RemoteError, Stylist};
use wardrobe_sync::SyncCoordinator;

const OPEN: usize = 1 << 20;

/// Item created on 2025-01-`day`, with a public photo named `<id>.jpg`.
pub fn record(id: &str, day: u32, is_clean: bool) -> ItemRecord {
    let mut attributes = Attributes::new();
    attributes.insert("category".into(), AttributeValue::from("Top"));
    ItemRecord {
        id: ItemId::from(id),
        created_at: Utc
            .with_ymd_and_hms(2025, 1, day, 12, 0, 0)
            .single()
            .expect("valid date"),
        image_ref: ImageRef::from(format!("https://cdn.test/wardrobe/{id}.jpg")),
        attributes,
        is_clean,
    }
}

pub fn ids(items: &[ItemRecord]) -> Vec<String> {
    items.iter().map(|i| i.id.0.clone()).collect()
}

// ---------------------------------------------------------------------------
// Remote catalog
// ---------------------------------------------------------------------------

pub struct FakeRemote {
    rows: Mutex<BTreeMap<ItemId, ItemRecord>>,
    pub list_calls: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_insert: AtomicBool,
    pub fail_update: AtomicBool,
    failing_deletes: Mutex<HashSet<ItemId>>,
    pub updates: Mutex<Vec<(ItemId, ItemPatch)>>,
    pub deletes: Mutex<Vec<ItemId>>,
    pub inserts: Mutex<Vec<NewItem>>,
    list_gate: Semaphore,
    push_gate: Semaphore,
    next_id: AtomicUsize,
}

impl FakeRemote {
    pub fn with_rows(rows: Vec<ItemRecord>) -> Self {
        Self {
            rows: Mutex::new(rows.into_iter().map(|r| (r.id.clone(), r)).collect()),
            list_calls: AtomicUsize::new(0),
            fail_list: AtomicBool::new(false),
            fail_insert: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            failing_deletes: Mutex::new(HashSet::new()),
            updates: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            inserts: Mutex::new(Vec::new()),
            list_gate: Semaphore::new(OPEN),
            push_gate: Semaphore::new(OPEN),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Hold every update and delete until [`FakeRemote::open_pushes`].
    pub fn gated(rows: Vec<ItemRecord>) -> Self {
        let remote = Self::with_rows(rows);
        remote.push_gate.forget_permits(OPEN);
        remote
    }

    pub fn open_pushes(&self) {
        self.push_gate.add_permits(OPEN);
    }

    /// Hold `list_all` until [`FakeRemote::open_list`].
    pub fn hold_list(&self) {
        self.list_gate.forget_permits(OPEN);
    }

    pub fn open_list(&self) {
        self.list_gate.add_permits(OPEN);
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.failing_deletes.lock().unwrap().insert(ItemId::from(id));
    }

    pub fn set_rows(&self, rows: Vec<ItemRecord>) {
        *self.rows.lock().unwrap() = rows.into_iter().map(|r| (r.id.clone(), r)).collect();
    }

    pub fn row(&self, id: &str) -> Option<ItemRecord> {
        self.rows.lock().unwrap().get(&ItemId::from(id)).cloned()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.rows.lock().unwrap().keys().map(|k| k.0.clone()).collect()
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn unavailable() -> RemoteError {
        RemoteError::Transport("connection refused".into())
    }
}

#[async_trait]
impl RemoteCatalog for FakeRemote {
    async fn list_all(&self) -> Result<Vec<ItemRecord>, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.list_gate.acquire().await.expect("gate open");
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn insert(&self, item: &NewItem) -> Result<ItemRecord, RemoteError> {
        self.inserts.lock().unwrap().push(item.clone());
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                code: 400,
                body: "bad row".into(),
            });
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = ItemRecord {
            id: ItemId::from(format!("srv-{n}")),
            created_at: Utc::now(),
            image_ref: item.image_ref.clone(),
            attributes: item.attributes.clone(),
            is_clean: item.is_clean,
        };
        self.rows
            .lock()
            .unwrap()
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn update_fields(&self, id: &ItemId, patch: &ItemPatch) -> Result<(), RemoteError> {
        let _permit = self.push_gate.acquire().await.expect("gate open");
        self.updates.lock().unwrap().push((id.clone(), patch.clone()));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        if let Some(row) = self.rows.lock().unwrap().get_mut(id) {
            row.apply(patch);
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &ItemId) -> Result<(), RemoteError> {
        let _permit = self.push_gate.acquire().await.expect("gate open");
        self.deletes.lock().unwrap().push(id.clone());
        if self.failing_deletes.lock().unwrap().contains(id) {
            return Err(Self::unavailable());
        }
        self.rows.lock().unwrap().remove(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Blob store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeBlobs {
    pub uploads: Mutex<Vec<(String, usize, String)>>,
    pub removed: Mutex<Vec<String>>,
    pub fail_upload: AtomicBool,
}

#[async_trait]
impl BlobStore for FakeBlobs {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ImageRef, RemoteError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(RemoteError::Status {
                code: 413,
                body: "payload too large".into(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((name.to_string(), bytes.len(), content_type.to_string()));
        Ok(self.resolve(name))
    }

    async fn remove(&self, name: &str) -> Result<(), RemoteError> {
        self.removed.lock().unwrap().push(name.to_string());
        Ok(())
    }

    fn resolve(&self, name: &str) -> ImageRef {
        ImageRef::from(format!("https://cdn.test/wardrobe/{name}"))
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct FakeClassifier {
    pub output: Attributes,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn returning(pairs: &[(&str, &str)]) -> Self {
        Self {
            output: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), AttributeValue::from(*v)))
                .collect(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: Attributes::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Classifier for FakeClassifier {
    async fn classify(&self, _bytes: &[u8], _content_type: &str) -> Result<Attributes, RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RemoteError::Rejected("no clothing detected".into()));
        }
        Ok(self.output.clone())
    }
}

// ---------------------------------------------------------------------------
// Stylist
// ---------------------------------------------------------------------------

/// Picks fixed ids and records the inventory it was shown.
pub struct FakeStylist {
    picks: Vec<ItemId>,
    fail: bool,
    pub seen: Mutex<Vec<(String, Vec<ItemId>)>>,
}

impl FakeStylist {
    pub fn picking(ids: &[&str]) -> Self {
        Self {
            picks: ids.iter().map(|id| ItemId::from(*id)).collect(),
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::picking(&[])
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Stylist for FakeStylist {
    async fn suggest(
        &self,
        intent: &str,
        inventory: &[ItemRecord],
    ) -> Result<OutfitSuggestion, RemoteError> {
        self.seen.lock().unwrap().push((
            intent.to_string(),
            inventory.iter().map(|item| item.id.clone()).collect(),
        ));
        if self.fail {
            return Err(RemoteError::Status {
                code: 503,
                body: "overloaded".into(),
            });
        }
        Ok(OutfitSuggestion {
            selected_item_ids: self.picks.clone(),
            outfit_type: Some("Casual".into()),
            reasoning: "relaxed and weather-appropriate".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub home: TempDir,
    pub replica: Arc<LocalReplicaStore>,
    pub remote: Arc<FakeRemote>,
    pub blobs: Arc<FakeBlobs>,
}

impl Harness {
    /// Replica seeded with `local`, remote holding `remote`.
    pub fn new(local: Vec<ItemRecord>, remote: FakeRemote) -> Self {
        let home = tempfile::tempdir().expect("tempdir");
        let replica = Arc::new(LocalReplicaStore::open_at(home.path()));
        if !local.is_empty() {
            replica.put_all(&local).expect("seed replica");
        }
        Self {
            home,
            replica,
            remote: Arc::new(remote),
            blobs: Arc::new(FakeBlobs::default()),
        }
    }

    /// Coordinator with no rate limit, for tests that reconcile repeatedly.
    pub fn coordinator(&self) -> SyncCoordinator {
        self.coordinator_with_interval(Duration::ZERO)
    }

    pub fn coordinator_with_interval(&self, interval: Duration) -> SyncCoordinator {
        SyncCoordinator::new(self.replica.clone(), self.remote.clone(), self.blobs.clone())
            .with_min_interval(interval)
    }

    pub fn local_ids(&self) -> Vec<String> {
        ids(&self.replica.get_all().expect("replica readable"))
    }
}
