//! Collaborator boundaries consumed by the sync layer.
//!
//! The remote store is the authority for item identity and content; the blob
//! store holds the photos; the classifier turns a photo into tags; the stylist
//! picks an outfit from tagged items. Each is reached through a trait so the
//! sync layer can run against the HTTP implementations in [`crate::rest`],
//! [`crate::vision`] and [`crate::stylist`] or against in-memory doubles.

use async_trait::async_trait;

use wardrobe_core::{
    Attributes, ImageRef, ItemId, ItemPatch, ItemRecord, NewItem, OutfitSuggestion,
};

use crate::error::RemoteError;

/// Authoritative item table.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Every item, in no guaranteed order.
    async fn list_all(&self) -> Result<Vec<ItemRecord>, RemoteError>;

    /// Insert a new row; the returned record carries the assigned `id` and
    /// `created_at`.
    async fn insert(&self, item: &NewItem) -> Result<ItemRecord, RemoteError>;

    async fn update_fields(&self, id: &ItemId, patch: &ItemPatch) -> Result<(), RemoteError>;

    async fn delete_by_id(&self, id: &ItemId) -> Result<(), RemoteError>;
}

/// Photo bucket paired with the item table.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name` and return the locator to record on the item.
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ImageRef, RemoteError>;

    async fn remove(&self, name: &str) -> Result<(), RemoteError>;

    /// Locator for an object name, without contacting the store.
    fn resolve(&self, name: &str) -> ImageRef;
}

/// Photo → tag map.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, bytes: &[u8], content_type: &str) -> Result<Attributes, RemoteError>;
}

/// Intent + clean inventory → outfit.
#[async_trait]
pub trait Stylist: Send + Sync {
    /// Pick items from `inventory` for `intent`. Ids outside `inventory` may
    /// come back and are the caller's to discard.
    async fn suggest(
        &self,
        intent: &str,
        inventory: &[ItemRecord],
    ) -> Result<OutfitSuggestion, RemoteError>;
}
