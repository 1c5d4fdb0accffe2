//! Upload pipeline: validate, store the blob, record its metadata.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::models::{NewMediaAsset, Principal, UploadReceipt, UploadRequest};
use crate::ports::{BlobStore, IdentityProvider, MetadataStore};
use crate::storage_key::derive_storage_key;
use common::format_size;

pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 4] =
    ["video/mp4", "video/quicktime", "video/x-msvideo", "video/mpeg"];

/// Receives upload progress as a percentage in `0..=100`.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// What an upload must satisfy before any I/O happens.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub allowed_mime_types: Vec<String>,
    pub max_upload_bytes: u64,
    pub key_prefix: String,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_mime_types: ALLOWED_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            key_prefix: "videos".to_string(),
        }
    }
}

impl UploadPolicy {
    fn allows(&self, mime_type: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime_type))
    }
}

pub struct UploadPipeline {
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    identity: Arc<dyn IdentityProvider>,
    policy: UploadPolicy,
}

impl UploadPipeline {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        identity: Arc<dyn IdentityProvider>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            blobs,
            metadata,
            identity,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Upload on behalf of `principal`.
    pub async fn upload(
        &self,
        request: UploadRequest,
        principal: Option<&Principal>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> MediaResult<UploadReceipt> {
        self.run(request, principal, on_progress, None).await
    }

    /// Upload on behalf of whoever the injected identity provider reports.
    pub async fn upload_as_current(
        &self,
        request: UploadRequest,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> MediaResult<UploadReceipt> {
        let principal = self.identity.current_principal().await;
        self.run(request, principal.as_ref(), on_progress, None).await
    }

    /// Like [`upload`](Self::upload), but gives up with
    /// [`MediaError::Cancelled`] once `cancel` fires during the blob write.
    /// A write already in flight at the store is not rolled back.
    pub async fn upload_cancellable(
        &self,
        request: UploadRequest,
        principal: Option<&Principal>,
        on_progress: Option<&ProgressFn<'_>>,
        cancel: &CancellationToken,
    ) -> MediaResult<UploadReceipt> {
        self.run(request, principal, on_progress, Some(cancel)).await
    }

    /// Checks run in order and the first failure wins.
    pub fn validate<'a>(
        &self,
        request: &UploadRequest,
        principal: Option<&'a Principal>,
    ) -> MediaResult<&'a Principal> {
        let principal = principal.ok_or(MediaError::Unauthenticated)?;

        let blob = &request.blob;
        if !self.policy.allows(&blob.mime_type) {
            return Err(MediaError::InvalidFileType {
                mime_type: blob.mime_type.clone(),
            });
        }

        if blob.size_bytes() > self.policy.max_upload_bytes {
            return Err(MediaError::FileTooLarge {
                size_bytes: blob.size_bytes(),
                limit_bytes: self.policy.max_upload_bytes,
            });
        }

        Ok(principal)
    }

    async fn run(
        &self,
        request: UploadRequest,
        principal: Option<&Principal>,
        on_progress: Option<&ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> MediaResult<UploadReceipt> {
        let principal = self.validate(&request, principal).map_err(|e| {
            warn!("Rejected upload of {}: {}", request.blob.file_name, e);
            e
        })?;

        let UploadRequest {
            blob,
            title,
            description,
            duration_seconds,
        } = request;

        let key = derive_storage_key(
            &self.policy.key_prefix,
            principal.id,
            &blob.file_name,
            &blob.mime_type,
            Utc::now(),
        );
        let size_bytes = blob.size_bytes();

        info!(
            "Uploading {} ({}) for {} to {}",
            blob.file_name,
            format_size(size_bytes),
            principal.id,
            key
        );

        if cancel.is_some_and(|token| token.is_cancelled()) {
            info!("Upload to {} cancelled before writing", key);
            return Err(MediaError::Cancelled { key });
        }

        let report = |loaded: u64, total: u64| {
            let percent = progress_percent(loaded, total);
            debug!("Upload progress for {}: {}%", key, percent);
            if let Some(callback) = on_progress {
                callback(percent);
            }
        };

        let write = self
            .blobs
            .put(&key, blob.data.clone(), &blob.mime_type, &report);

        let written = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        info!("Upload to {} cancelled while writing", key);
                        return Err(MediaError::Cancelled { key: key.clone() });
                    }
                    result = write => result,
                }
            }
            None => write.await,
        };

        let stored = match written {
            Ok(stored) => stored,
            Err(source) => {
                error!("Failed to store {}: {:#}", key, source);
                return Err(MediaError::StorageWriteFailed { key, source });
            }
        };

        let public_url = match self.blobs.public_url_for(&stored.key) {
            Ok(url) => url,
            Err(source) => {
                error!("Failed to derive public URL for {}: {:#}", stored.key, source);
                return Err(MediaError::StorageWriteFailed {
                    key: stored.key,
                    source,
                });
            }
        };

        let record = NewMediaAsset {
            title,
            description,
            file_name: blob.file_name,
            file_size_bytes: size_bytes,
            mime_type: blob.mime_type,
            storage_path: stored.key.clone(),
            public_url: public_url.clone(),
            owner_id: principal.id,
            created_at: Utc::now(),
            duration_seconds: duration_seconds.unwrap_or(0.0),
        };

        let asset = match self.metadata.insert_asset(record).await {
            Ok(asset) => asset,
            Err(source) => {
                error!(
                    "Failed to record metadata for {}, blob left orphaned: {:#}",
                    stored.key, source
                );
                return Err(MediaError::MetadataWriteFailed {
                    orphaned_key: stored.key,
                    source,
                });
            }
        };

        info!("Uploaded video {} at {}", asset.id, public_url);

        Ok(UploadReceipt {
            asset_id: asset.id,
            public_url,
            storage_path: asset.storage_path,
        })
    }
}

/// Convert a byte fraction to a whole percentage in `0..=100`.
pub fn progress_percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }

    let percent = (loaded.min(total) as f64 / total as f64 * 100.0).round();
    percent as u8
}
