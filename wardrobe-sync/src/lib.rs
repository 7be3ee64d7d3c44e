//! # wardrobe-sync
//!
//! Local-first sync between the on-device replica and the remote catalog.
//!
//! [`SyncCoordinator`] owns the reconcile state machine and the optimistic
//! mutation paths; [`Catalog`] is the facade callers use.

pub mod catalog;
pub mod coordinator;
pub mod error;

pub use catalog::{Catalog, Outfit};
pub use coordinator::{
    Push, ReconcileOutcome, ReconcileStatus, SyncCoordinator, SyncPhase, SyncStatus,
    MIN_SYNC_INTERVAL,
};
pub use error::{CreateError, SyncError};
