//! Catalog reads enriched with owner profiles.
//!
//! Profiles are joined in memory with a hash lookup per listing. That is fine
//! for catalogs that fit in one response; larger catalogs need paging at the
//! store before this join.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};
use crate::models::{CatalogEntry, CatalogListing, Enrichment, MediaAsset, OwnerProfile};
use crate::ports::{MetadataStore, ProfileStore};

pub struct CatalogReader {
    metadata: Arc<dyn MetadataStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl CatalogReader {
    pub fn new(metadata: Arc<dyn MetadataStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { metadata, profiles }
    }

    /// Every video, newest first, each paired with its owner's profile.
    ///
    /// A failing profile lookup does not fail the listing: every entry gets
    /// the placeholder profile and the listing is marked degraded.
    pub async fn list_all(&self) -> MediaResult<CatalogListing> {
        let mut assets = self.metadata.list_assets().await.map_err(|e| {
            error!("Failed to list videos: {:#}", e);
            MediaError::MetadataReadFailed(e)
        })?;
        assets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if assets.is_empty() {
            return Ok(CatalogListing {
                entries: Vec::new(),
                enrichment: Enrichment::Complete,
            });
        }

        let owner_ids: Vec<Uuid> = assets
            .iter()
            .map(|asset| asset.owner_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let listing = match self.profiles.profiles_by_ids(&owner_ids).await {
            Ok(profiles) => {
                let by_id: HashMap<Uuid, OwnerProfile> =
                    profiles.into_iter().map(|p| (p.id, p)).collect();

                CatalogListing {
                    entries: assets
                        .into_iter()
                        .map(|asset| {
                            let profile = by_id
                                .get(&asset.owner_id)
                                .cloned()
                                .unwrap_or_else(|| OwnerProfile::placeholder(asset.owner_id));
                            CatalogEntry { asset, profile }
                        })
                        .collect(),
                    enrichment: Enrichment::Complete,
                }
            }
            Err(e) => {
                warn!("Listing videos with placeholder profiles: {:#}", e);
                let reason = MediaError::ProfileFetchFailed(e).to_string();

                CatalogListing {
                    entries: assets.into_iter().map(with_placeholder).collect(),
                    enrichment: Enrichment::Degraded { reason },
                }
            }
        };

        info!("Listed {} videos", listing.entries.len());
        Ok(listing)
    }

    /// One video with its owner's profile, fetched in a single joined read.
    ///
    /// Unlike [`list_all`](Self::list_all), a failing read here is returned
    /// to the caller. An owner without a profile row still gets the
    /// placeholder.
    pub async fn get_by_id(&self, id: Uuid) -> MediaResult<CatalogEntry> {
        let found = self.metadata.find_asset_with_owner(id).await.map_err(|e| {
            error!("Failed to load video {}: {:#}", id, e);
            MediaError::MetadataReadFailed(e)
        })?;

        let (asset, profile) = found.ok_or(MediaError::NotFound(id))?;
        let profile = profile.unwrap_or_else(|| OwnerProfile::placeholder(asset.owner_id));

        Ok(CatalogEntry { asset, profile })
    }
}

fn with_placeholder(asset: MediaAsset) -> CatalogEntry {
    let profile = OwnerProfile::placeholder(asset.owner_id);
    CatalogEntry { asset, profile }
}
