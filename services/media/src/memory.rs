//! In-process blob, metadata and profile stores
//!
//! Used for local runs (`MEDIA_BACKEND=memory`) and by the test suites.
//! Nothing is persisted across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::models::{MediaAsset, NewMediaAsset, OwnerProfile};
use crate::ports::{BlobStore, ByteProgress, MetadataStore, ProfileStore, StoredObject};

/// Progress is reported once per chunk of this size.
const PROGRESS_CHUNK: usize = 1024 * 1024;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: String,
}

/// Blob store keeping payloads in a map; keys are write-once.
#[derive(Debug, Clone)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: Arc<Mutex<HashMap<String, StoredBlob>>>,
}

impl InMemoryBlobStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.blobs.lock().await.get(key).map(|b| b.data.clone())
    }

    pub async fn content_type(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .await
            .get(key)
            .map(|b| b.content_type.clone())
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new("memory://media")
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<StoredObject> {
        if key.is_empty() {
            bail!("storage key must not be empty");
        }

        let mut blobs = self.blobs.lock().await;
        if blobs.contains_key(key) {
            bail!("object `{}` already exists", key);
        }

        let total = data.len() as u64;
        let mut loaded = 0u64;
        for chunk in data.chunks(PROGRESS_CHUNK) {
            loaded += chunk.len() as u64;
            progress(loaded, total);
        }
        if total == 0 {
            progress(0, 0);
        }

        blobs.insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );

        Ok(StoredObject {
            key: key.to_string(),
        })
    }

    fn public_url_for(&self, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(anyhow!("cannot build a URL for an empty key"));
        }
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

/// Video records and profiles kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    assets: Arc<Mutex<Vec<MediaAsset>>>,
    profiles: Arc<Mutex<HashMap<Uuid, OwnerProfile>>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_profile(&self, profile: OwnerProfile) {
        info!("Storing profile for {}", profile.id);
        self.profiles.lock().await.insert(profile.id, profile);
    }

    /// Insert a complete record, keeping its id.
    pub async fn seed_asset(&self, asset: MediaAsset) {
        self.assets.lock().await.push(asset);
    }

    pub async fn asset_count(&self) -> usize {
        self.assets.lock().await.len()
    }
}

#[async_trait]
impl MetadataStore for InMemoryCatalogStore {
    async fn insert_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset> {
        let mut assets = self.assets.lock().await;
        if assets.iter().any(|a| a.storage_path == asset.storage_path) {
            bail!("storage path `{}` is already recorded", asset.storage_path);
        }

        let asset = asset.with_id(Uuid::new_v4());
        assets.push(asset.clone());
        Ok(asset)
    }

    async fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        let mut assets = self.assets.lock().await.clone();
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(assets)
    }

    async fn find_asset_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<(MediaAsset, Option<OwnerProfile>)>> {
        let asset = self
            .assets
            .lock()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned();

        match asset {
            Some(asset) => {
                let profile = self.profiles.lock().await.get(&asset.owner_id).cloned();
                Ok(Some((asset, profile)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProfileStore for InMemoryCatalogStore {
    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<OwnerProfile>> {
        let profiles = self.profiles.lock().await;
        Ok(ids.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }
}
