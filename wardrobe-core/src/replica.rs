//! On-device replica of the item catalog.
//!
//! # Storage layout
//!
//! ```text
//! ~/.wardrobe/
//!   replica.json          (items keyed by id + sync metadata, mode 0600)
//!   replica.attempt.json  (last reconcile attempt, mode 0600)
//! ```
//!
//! Items and the `last_sync_at` row share one document so that clearing or
//! upgrading the replica drops both together. The attempt record lives beside
//! it so that a failed reconcile leaves `replica.json` untouched. Every write goes through the
//! same `.tmp` + rename sequence, so a crash mid-write leaves the previous
//! document intact.
//!
//! Read-modify-write operations are serialized by an internal lock; the store
//! can be shared across tasks behind an `Arc`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, ReplicaError};
use crate::types::{sort_newest_first, ItemId, ItemPatch, ItemRecord, SyncAttempt, SyncMeta};

/// Schema version written into every replica document.
pub const REPLICA_VERSION: u32 = 1;

/// `<home>/.wardrobe/replica.json`: pure, no I/O.
pub fn replica_path_at(home: &Path) -> PathBuf {
    home.join(".wardrobe").join("replica.json")
}

/// On-disk replica payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ReplicaFile {
    version: u32,
    #[serde(default)]
    items: BTreeMap<ItemId, ItemRecord>,
    #[serde(default)]
    meta: SyncMeta,
}

impl Default for ReplicaFile {
    fn default() -> Self {
        Self {
            version: REPLICA_VERSION,
            items: BTreeMap::new(),
            meta: SyncMeta::default(),
        }
    }
}

/// Only the version field, read first so an older layout can be recognised
/// without failing on its other fields.
#[derive(Debug, Deserialize)]
struct VersionHeader {
    #[serde(default)]
    version: u32,
}

/// Durable local store of [`ItemRecord`]s plus the [`SyncMeta`] singleton.
#[derive(Debug)]
pub struct LocalReplicaStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LocalReplicaStore {
    /// Open the replica rooted at `home`. No I/O happens until first use.
    pub fn open_at(home: &Path) -> Self {
        Self::with_path(replica_path_at(home))
    }

    /// Open the replica under the user's home directory.
    pub fn open() -> Result<Self, ReplicaError> {
        let home = dirs::home_dir().ok_or(ReplicaError::HomeNotFound)?;
        Ok(Self::open_at(&home))
    }

    /// Open a replica stored at an explicit file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All cached items, newest first.
    pub fn get_all(&self) -> Result<Vec<ItemRecord>, ReplicaError> {
        let _guard = self.guard();
        let file = self.read()?;
        let mut items: Vec<ItemRecord> = file.items.into_values().collect();
        sort_newest_first(&mut items);
        Ok(items)
    }

    pub fn get(&self, id: &ItemId) -> Result<Option<ItemRecord>, ReplicaError> {
        let _guard = self.guard();
        Ok(self.read()?.items.remove(id))
    }

    pub fn has_data(&self) -> Result<bool, ReplicaError> {
        let _guard = self.guard();
        Ok(!self.read()?.items.is_empty())
    }

    /// Replace the whole item set. Sync metadata is preserved.
    pub fn put_all(&self, items: &[ItemRecord]) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        file.items = items
            .iter()
            .map(|item| (item.id.clone(), item.clone()))
            .collect();
        self.write(&file)
    }

    /// Insert or overwrite a single item.
    pub fn put_one(&self, item: &ItemRecord) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        file.items.insert(item.id.clone(), item.clone());
        self.write(&file)
    }

    /// Read-modify-write one item under a single lock.
    ///
    /// `patch_for` sees the cached record and returns the change to apply.
    /// Returns the updated record, or `None` when the id is not cached.
    pub fn update_one<F>(&self, id: &ItemId, patch_for: F) -> Result<Option<ItemRecord>, ReplicaError>
    where
        F: FnOnce(&ItemRecord) -> ItemPatch,
    {
        let _guard = self.guard();
        let mut file = self.read()?;
        let Some(item) = file.items.get_mut(id) else {
            return Ok(None);
        };
        let patch = patch_for(item);
        item.apply(&patch);
        let updated = item.clone();
        self.write(&file)?;
        Ok(Some(updated))
    }

    /// Remove a single item. Removing an unknown id is not an error.
    pub fn remove_one(&self, id: &ItemId) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        if file.items.remove(id).is_none() {
            return Ok(());
        }
        self.write(&file)
    }

    pub fn last_sync(&self) -> Result<Option<DateTime<Utc>>, ReplicaError> {
        let _guard = self.guard();
        Ok(self.read()?.meta.last_sync_at)
    }

    pub fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        let mut file = self.read()?;
        file.meta.last_sync_at = Some(at);
        self.write(&file)
    }

    /// The most recent reconcile that reached the remote store, if recorded.
    pub fn last_attempt(&self) -> Result<Option<SyncAttempt>, ReplicaError> {
        let _guard = self.guard();
        let path = self.attempt_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&path, err)),
        };
        match serde_json::from_str(&contents) {
            Ok(attempt) => Ok(Some(attempt)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "attempt record unreadable, ignoring");
                Ok(None)
            }
        }
    }

    pub fn record_attempt(&self, attempt: &SyncAttempt) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        let json = serde_json::to_string_pretty(attempt)?;
        write_atomic(&self.attempt_path(), &json)
    }

    /// Drop every item, the sync metadata and the attempt record.
    pub fn clear(&self) -> Result<(), ReplicaError> {
        let _guard = self.guard();
        self.write(&ReplicaFile::default())?;
        let attempt = self.attempt_path();
        match std::fs::remove_file(&attempt) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_err(&attempt, err)),
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn attempt_path(&self) -> PathBuf {
        self.path.with_extension("attempt.json")
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The lock protects no data of its own; a poisoned guard is still usable.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read(&self) -> Result<ReplicaFile, ReplicaError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ReplicaFile::default()),
            Err(err) => return Err(io_err(&self.path, err)),
        };

        let header: VersionHeader = match serde_json::from_str(&contents) {
            Ok(header) => header,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "replica unreadable, starting from an empty cache",
                );
                return Ok(ReplicaFile::default());
            }
        };

        if header.version > REPLICA_VERSION {
            return Err(ReplicaError::UnsupportedVersion {
                path: self.path.clone(),
                found: header.version,
                supported: REPLICA_VERSION,
            });
        }
        if header.version < REPLICA_VERSION {
            tracing::info!(
                path = %self.path.display(),
                found = header.version,
                "replica predates current layout, discarding cached items",
            );
            return Ok(ReplicaFile::default());
        }

        match serde_json::from_str::<ReplicaFile>(&contents) {
            Ok(file) => Ok(file),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "replica unreadable, starting from an empty cache",
                );
                Ok(ReplicaFile::default())
            }
        }
    }

    fn write(&self, file: &ReplicaFile) -> Result<(), ReplicaError> {
        let json = serde_json::to_string_pretty(file)?;
        write_atomic(&self.path, &json)
    }
}

/// Write flow: `.tmp` sibling → `chmod 0600` → `rename`.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ReplicaError> {
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid replica path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(err) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, err));
    }
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ReplicaError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ReplicaError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
