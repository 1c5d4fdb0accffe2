//! Collaborator contracts
//!
//! Authentication, blob storage and the metadata database live outside this
//! crate. The pipeline only talks to them through these traits, so every
//! handle is injected at construction time.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::models::{MediaAsset, NewMediaAsset, OwnerProfile, Principal};

/// Receives `(loaded, total)` byte counts while a blob is written. The
/// callback may borrow from the caller for the duration of the write.
pub type ByteProgress<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Resolves the principal active in the current context.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self) -> Option<Principal>;
}

/// Location of a blob after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `key`, reporting progress as bytes are sent.
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<StoredObject>;

    /// Dereferenceable locator for a stored key. Must not touch the store.
    fn public_url_for(&self, key: &str) -> Result<String>;
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a record; the store assigns its id.
    async fn insert_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset>;

    /// All records, newest first.
    async fn list_assets(&self) -> Result<Vec<MediaAsset>>;

    /// One record joined with its owner's profile in a single request.
    /// The profile is `None` when no profile row exists for the owner.
    async fn find_asset_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<(MediaAsset, Option<OwnerProfile>)>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Profiles for exactly the given ids; unknown ids are simply absent.
    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<OwnerProfile>>;
}

/// Identity fixed at construction, e.g. from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    principal: Option<Principal>,
}

impl StaticIdentity {
    pub fn new(principal: Option<Principal>) -> Self {
        Self { principal }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_principal(&self) -> Option<Principal> {
        self.principal.clone()
    }
}
