//! Wardrobe core library: domain types, on-device replica, configuration.
//!
//! - [`types`]: item records, attribute values, patches
//! - [`replica`]: [`LocalReplicaStore`], the durable local copy of the catalog
//! - [`query`]: filtering over a local snapshot
//! - [`config`]: `~/.wardrobe/config.yaml`
//! - [`error`]: [`ReplicaError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod query;
pub mod replica;
pub mod types;

pub use config::WardrobeConfig;
pub use error::{ConfigError, ReplicaError};
pub use query::{ItemFilter, SortOrder, StatusFilter};
pub use replica::LocalReplicaStore;
pub use types::{
    AttributeValue, Attributes, ImageRef, ItemDraft, ItemId, ItemPatch, ItemRecord, NewItem,
    OutfitSuggestion, ReconcileStatus, SyncAttempt, SyncMeta,
};
