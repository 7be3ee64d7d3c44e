//! `Catalog`: the surface screens and the CLI call.
//!
//! Thin layer over [`SyncCoordinator`]: resolves ids to the cached records a
//! mutation needs, exposes local queries and asks the stylist for outfits.
//! Nothing here returns an error except [`Catalog::create`].

use std::sync::Arc;

use serde::Serialize;

use wardrobe_core::{
    Attributes, ImageRef, ItemDraft, ItemFilter, ItemId, ItemRecord, LocalReplicaStore,
    OutfitSuggestion, WardrobeConfig,
};
use wardrobe_remote::{RestCatalog, Stylist, VisionClassifier, VisionStylist};

use crate::coordinator::{Push, ReconcileOutcome, SyncCoordinator, SyncStatus};
use crate::error::CreateError;

/// A stylist's pick resolved against the local cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outfit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outfit_type: Option<String>,
    pub reasoning: String,
    /// Selected items that are cached and clean, in the stylist's order.
    pub items: Vec<ItemRecord>,
}

pub struct Catalog {
    coordinator: SyncCoordinator,
    stylist: Option<Arc<dyn Stylist>>,
}

impl Catalog {
    pub fn new(coordinator: SyncCoordinator) -> Self {
        Self {
            coordinator,
            stylist: None,
        }
    }

    pub fn with_stylist(mut self, stylist: Arc<dyn Stylist>) -> Self {
        self.stylist = Some(stylist);
        self
    }

    /// Wire the REST catalog, its photo bucket and (if configured) the vision
    /// classifier and stylist around `replica`.
    pub fn from_config(config: &WardrobeConfig, replica: Arc<LocalReplicaStore>) -> Self {
        let rest = Arc::new(RestCatalog::new(&config.remote));
        let mut coordinator = SyncCoordinator::new(replica, rest.clone(), rest)
            .with_min_interval(config.sync.min_interval());
        let Some(model) = &config.classifier else {
            return Self::new(coordinator);
        };
        coordinator = coordinator.with_classifier(Arc::new(VisionClassifier::new(model)));
        Self::new(coordinator).with_stylist(Arc::new(VisionStylist::new(model)))
    }

    pub fn coordinator(&self) -> &SyncCoordinator {
        &self.coordinator
    }

    /// Cache-first read; see [`SyncCoordinator::load`].
    pub async fn load<L, R>(&self, on_local: L, on_remote: R) -> ReconcileOutcome
    where
        L: FnOnce(Vec<ItemRecord>),
        R: FnOnce(Vec<ItemRecord>),
    {
        self.coordinator.load(on_local, on_remote).await
    }

    /// Pull-to-refresh. Subject to the same rate limit as every reconcile.
    pub async fn refresh_now(&self) -> ReconcileOutcome {
        self.coordinator.reconcile().await
    }

    pub async fn toggle(&self, id: &ItemId) -> Option<Push> {
        self.coordinator.toggle_cleanliness(id).await
    }

    pub async fn edit(&self, id: &ItemId, attributes: Attributes) -> Option<Push> {
        self.coordinator.update_attributes(id, attributes).await
    }

    /// Delete one item and its photo.
    pub async fn remove(&self, id: &ItemId) -> Push {
        let image = self.cached_image(id).await;
        self.coordinator.delete_item(id, image.as_ref()).await
    }

    pub async fn remove_many(&self, ids: &[ItemId]) -> Push {
        let cached = self.coordinator.local_snapshot().await;
        let targets = ids
            .iter()
            .map(|id| {
                let image = cached
                    .iter()
                    .find(|item| &item.id == id)
                    .map(|item| item.image_ref.clone());
                (id.clone(), image)
            })
            .collect();
        self.coordinator.delete_many(targets).await
    }

    pub async fn create(&self, draft: ItemDraft, bytes: Vec<u8>) -> Result<ItemRecord, CreateError> {
        self.coordinator.create_item(draft, bytes).await
    }

    pub async fn status(&self) -> SyncStatus {
        self.coordinator.sync_status().await
    }

    /// Cached items selected by `filter`. Never contacts the remote store.
    pub async fn items(&self, filter: &ItemFilter) -> Vec<ItemRecord> {
        filter.apply(&self.coordinator.local_snapshot().await)
    }

    pub async fn clear_cache(&self) -> bool {
        self.coordinator.clear_local().await
    }

    /// Outfit for `intent` chosen from cached clean items.
    ///
    /// Never fails: with nothing clean, no stylist configured, or a stylist
    /// error, the outfit is empty and `reasoning` says why. Selected ids that
    /// are not cached and clean are dropped.
    pub async fn suggest(&self, intent: &str) -> Outfit {
        let inventory = self.items(&ItemFilter::clean_only()).await;
        let suggestion = if inventory.is_empty() {
            OutfitSuggestion::empty("no clean items available")
        } else if let Some(stylist) = &self.stylist {
            match stylist.suggest(intent, &inventory).await {
                Ok(suggestion) => suggestion,
                Err(err) => {
                    tracing::warn!(error = %err, "stylist request failed");
                    OutfitSuggestion::empty(format!("stylist unavailable: {err}"))
                }
            }
        } else {
            OutfitSuggestion::empty("no stylist configured")
        };

        let items: Vec<ItemRecord> = suggestion
            .selected_item_ids
            .iter()
            .filter_map(|id| inventory.iter().find(|item| &item.id == id).cloned())
            .collect();
        if items.len() < suggestion.selected_item_ids.len() {
            tracing::debug!(
                selected = suggestion.selected_item_ids.len(),
                kept = items.len(),
                "dropped stylist picks outside the clean inventory",
            );
        }
        Outfit {
            outfit_type: suggestion.outfit_type,
            reasoning: suggestion.reasoning,
            items,
        }
    }

    async fn cached_image(&self, id: &ItemId) -> Option<ImageRef> {
        let replica = self.coordinator.replica().clone();
        let target = id.clone();
        let found = tokio::task::spawn_blocking(move || replica.get(&target)).await;
        match found {
            Ok(Ok(item)) => item.map(|item| item.image_ref),
            Ok(Err(err)) => {
                tracing::warn!(item_id = %id, error = %err, "photo lookup failed, deleting row only");
                None
            }
            Err(err) => {
                tracing::warn!(item_id = %id, error = %err, "photo lookup task failed");
                None
            }
        }
    }
}
