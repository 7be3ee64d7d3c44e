//! Error types for wardrobe-sync.

use thiserror::Error;

use wardrobe_core::ReplicaError;
use wardrobe_remote::RemoteError;

/// Local-side failures inside the coordinator.
///
/// These never reach facade callers: the coordinator logs them and degrades
/// to remote data.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The on-device replica could not be read or written.
    #[error("local storage unavailable: {0}")]
    Replica(#[from] ReplicaError),

    /// The blocking worker running a replica operation failed.
    #[error("replica task failed: {0}")]
    Task(String),
}

/// Why adding an item failed. Nothing is mirrored locally in any case.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("photo classification failed: {0}")]
    Classify(#[source] RemoteError),

    #[error("photo upload failed: {0}")]
    Upload(#[source] RemoteError),

    #[error("remote insert failed: {0}")]
    Insert(#[source] RemoteError),
}
