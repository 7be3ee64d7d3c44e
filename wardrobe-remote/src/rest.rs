//! REST client for the hosted item table and its storage bucket.
//!
//! Rows live behind `<url>/rest/v1/<table>` (filter syntax `id=eq.<id>`),
//! photos behind `<url>/storage/v1/object/<bucket>/<name>`. Requests are
//! made with a blocking `ureq::Agent` on tokio's blocking pool; timeouts are
//! the agent defaults.

use async_trait::async_trait;
use serde_json::json;

use wardrobe_core::config::RemoteConfig;
use wardrobe_core::{ImageRef, ItemId, ItemPatch, ItemRecord, NewItem};

use crate::client::{BlobStore, RemoteCatalog};
use crate::error::RemoteError;

/// Item table + photo bucket over HTTP.
#[derive(Debug, Clone)]
pub struct RestCatalog {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    table: String,
    bucket: String,
}

impl RestCatalog {
    pub fn new(config: &RemoteConfig) -> Self {
        Self {
            agent: ureq::Agent::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            table: config.table.clone(),
            bucket: config.bucket.clone(),
        }
    }

    /// `<url>/rest/v1/<table>`
    pub fn rows_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    /// `<url>/storage/v1/object/<bucket>/<name>`
    pub fn object_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name)
    }

    /// `<url>/storage/v1/object/public/<bucket>/<name>`
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, name
        )
    }

    fn authorized(&self, request: ureq::Request) -> ureq::Request {
        request
            .set("apikey", &self.api_key)
            .set("Authorization", &format!("Bearer {}", self.api_key))
    }

    fn list_blocking(&self) -> Result<Vec<ItemRecord>, RemoteError> {
        tracing::debug!(table = %self.table, "listing rows");
        let response = self
            .authorized(self.agent.get(&self.rows_url()))
            .query("select", "*")
            .query("order", "created_at.desc")
            .call()?;
        let rows = response
            .into_json::<Vec<ItemRecord>>()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        tracing::debug!(rows = rows.len(), "rows listed");
        Ok(rows)
    }

    fn insert_blocking(&self, item: &NewItem) -> Result<ItemRecord, RemoteError> {
        tracing::debug!(table = %self.table, "inserting row");
        let response = self
            .authorized(self.agent.post(&self.rows_url()))
            .set("Prefer", "return=representation")
            .send_json(item)?;
        let mut rows = response
            .into_json::<Vec<ItemRecord>>()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if rows.is_empty() {
            return Err(RemoteError::Rejected("insert returned no row".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    fn update_blocking(&self, id: &ItemId, patch: &ItemPatch) -> Result<(), RemoteError> {
        tracing::debug!(item_id = %id, "patching row");
        self.authorized(self.agent.request("PATCH", &self.rows_url()))
            .query("id", &format!("eq.{id}"))
            .send_json(patch)?;
        Ok(())
    }

    fn delete_blocking(&self, id: &ItemId) -> Result<(), RemoteError> {
        tracing::debug!(item_id = %id, "deleting row");
        self.authorized(self.agent.delete(&self.rows_url()))
            .query("id", &format!("eq.{id}"))
            .call()?;
        Ok(())
    }

    fn upload_blocking(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<ImageRef, RemoteError> {
        tracing::debug!(bucket = %self.bucket, name, bytes = bytes.len(), "uploading photo");
        self.authorized(self.agent.post(&self.object_url(name)))
            .set("Content-Type", content_type)
            .set("x-upsert", "false")
            .send_bytes(bytes)?;
        Ok(ImageRef::from(self.public_url(name)))
    }

    fn remove_blocking(&self, name: &str) -> Result<(), RemoteError> {
        tracing::debug!(bucket = %self.bucket, name, "removing photo");
        let url = format!("{}/storage/v1/object/{}", self.base_url, self.bucket);
        self.authorized(self.agent.delete(&url))
            .send_json(json!({ "prefixes": [name] }))?;
        Ok(())
    }
}

/// Run a blocking request on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, RemoteError>
where
    F: FnOnce() -> Result<T, RemoteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| RemoteError::Task(err.to_string()))?
}

#[async_trait]
impl RemoteCatalog for RestCatalog {
    async fn list_all(&self) -> Result<Vec<ItemRecord>, RemoteError> {
        let client = self.clone();
        blocking(move || client.list_blocking()).await
    }

    async fn insert(&self, item: &NewItem) -> Result<ItemRecord, RemoteError> {
        let client = self.clone();
        let item = item.clone();
        blocking(move || client.insert_blocking(&item)).await
    }

    async fn update_fields(&self, id: &ItemId, patch: &ItemPatch) -> Result<(), RemoteError> {
        let client = self.clone();
        let id = id.clone();
        let patch = patch.clone();
        blocking(move || client.update_blocking(&id, &patch)).await
    }

    async fn delete_by_id(&self, id: &ItemId) -> Result<(), RemoteError> {
        let client = self.clone();
        let id = id.clone();
        blocking(move || client.delete_blocking(&id)).await
    }
}

#[async_trait]
impl BlobStore for RestCatalog {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<ImageRef, RemoteError> {
        let client = self.clone();
        let name = name.to_string();
        let content_type = content_type.to_string();
        blocking(move || client.upload_blocking(&name, &bytes, &content_type)).await
    }

    async fn remove(&self, name: &str) -> Result<(), RemoteError> {
        let client = self.clone();
        let name = name.to_string();
        blocking(move || client.remove_blocking(&name)).await
    }

    fn resolve(&self, name: &str) -> ImageRef {
        ImageRef::from(self.public_url(name))
    }
}
