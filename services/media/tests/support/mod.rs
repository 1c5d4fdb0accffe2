//! Collaborator doubles shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use media::memory::{InMemoryBlobStore, InMemoryCatalogStore};
use media::models::{MediaAsset, NewMediaAsset, OwnerProfile, Principal};
use media::ports::{
    BlobStore, ByteProgress, MetadataStore, ProfileStore, StaticIdentity, StoredObject,
};
use media::{CatalogReader, UploadPipeline, UploadPolicy, UploadRequest, VideoBlob};

/// Blob store that counts calls and can be told to fail or stall.
#[derive(Clone, Default)]
pub struct FlakyBlobs {
    pub inner: InMemoryBlobStore,
    pub puts: Arc<AtomicUsize>,
    pub url_calls: Arc<AtomicUsize>,
    pub fail_put: Arc<AtomicBool>,
    pub fail_url: Arc<AtomicBool>,
    pub stall: Arc<AtomicBool>,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<StoredObject> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put.load(Ordering::SeqCst) {
            bail!("bucket unreachable");
        }
        if self.stall.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.inner.put(key, data, content_type, progress).await
    }

    fn public_url_for(&self, key: &str) -> Result<String> {
        self.url_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_url.load(Ordering::SeqCst) {
            bail!("no public endpoint");
        }
        self.inner.public_url_for(key)
    }
}

/// Metadata and profile store that counts calls and can be told to fail.
#[derive(Clone, Default)]
pub struct FlakyCatalog {
    pub inner: InMemoryCatalogStore,
    pub inserts: Arc<AtomicUsize>,
    pub profile_lookups: Arc<AtomicUsize>,
    pub last_profile_ids: Arc<std::sync::Mutex<Vec<Uuid>>>,
    pub fail_insert: Arc<AtomicBool>,
    pub fail_reads: Arc<AtomicBool>,
    pub fail_profiles: Arc<AtomicBool>,
}

#[async_trait]
impl MetadataStore for FlakyCatalog {
    async fn insert_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            bail!("duplicate key value violates unique constraint");
        }
        self.inner.insert_asset(asset).await
    }

    async fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("database is down");
        }
        self.inner.list_assets().await
    }

    async fn find_asset_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<(MediaAsset, Option<OwnerProfile>)>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("join on profiles failed");
        }
        self.inner.find_asset_with_owner(id).await
    }
}

#[async_trait]
impl ProfileStore for FlakyCatalog {
    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<OwnerProfile>> {
        self.profile_lookups.fetch_add(1, Ordering::SeqCst);
        *self.last_profile_ids.lock().unwrap() = ids.to_vec();
        if self.fail_profiles.load(Ordering::SeqCst) {
            bail!("identity store timed out");
        }
        self.inner.profiles_by_ids(ids).await
    }
}

pub struct Harness {
    pub blobs: FlakyBlobs,
    pub catalog: FlakyCatalog,
    pub pipeline: UploadPipeline,
    pub reader: CatalogReader,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_identity(None)
    }

    pub fn with_identity(current: Option<Principal>) -> Self {
        let blobs = FlakyBlobs {
            inner: InMemoryBlobStore::new("https://cdn.example.com"),
            ..Default::default()
        };
        let catalog = FlakyCatalog::default();

        let pipeline = UploadPipeline::new(
            Arc::new(blobs.clone()),
            Arc::new(catalog.clone()),
            Arc::new(StaticIdentity::new(current)),
            UploadPolicy::default(),
        );
        let reader = CatalogReader::new(Arc::new(catalog.clone()), Arc::new(catalog.clone()));

        Self {
            blobs,
            catalog,
            pipeline,
            reader,
        }
    }

    pub fn io_calls(&self) -> usize {
        self.blobs.puts.load(Ordering::SeqCst)
            + self.blobs.url_calls.load(Ordering::SeqCst)
            + self.catalog.inserts.load(Ordering::SeqCst)
    }
}

pub fn principal() -> Principal {
    Principal {
        id: Uuid::new_v4(),
        email: Some("uploader@example.com".to_string()),
    }
}

pub fn video(name: &str, mime: &str, size: usize) -> UploadRequest {
    UploadRequest::new(
        VideoBlob::new(name, mime, Bytes::from(vec![0u8; size])),
        "Trip to the coast",
        "Waves and wind",
    )
}

pub fn profile(id: Uuid, name: &str) -> OwnerProfile {
    OwnerProfile {
        id,
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}
