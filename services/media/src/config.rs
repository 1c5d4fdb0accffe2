//! Media service configuration
//!
//! Values come from `MEDIA_*` environment variables, e.g.
//! `MEDIA_BUCKET_NAME` or `MEDIA_ALLOWED_MIME_TYPES=video/mp4,video/mpeg`.

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::Principal;
use crate::pipeline::{ALLOWED_MIME_TYPES, MAX_UPLOAD_BYTES, UploadPolicy};
use crate::s3_store::MIN_PART_SIZE;

/// Where blobs and metadata live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// S3 for blobs, PostgreSQL for metadata and profiles.
    S3,
    /// Everything in process memory.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,
    #[serde(default)]
    pub public_base_url: Option<String>,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: usize,
    /// Principal the CLI uploads as.
    #[serde(default)]
    pub uploader_id: Option<Uuid>,
}

fn default_backend() -> BackendKind {
    BackendKind::S3
}

fn default_bucket_name() -> String {
    "media-bucket".to_string()
}

fn default_key_prefix() -> String {
    "videos".to_string()
}

fn default_max_upload_bytes() -> u64 {
    MAX_UPLOAD_BYTES
}

fn default_allowed_mime_types() -> Vec<String> {
    ALLOWED_MIME_TYPES.iter().map(|m| m.to_string()).collect()
}

fn default_part_size_bytes() -> usize {
    8 * 1024 * 1024
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            bucket_name: default_bucket_name(),
            public_base_url: None,
            key_prefix: default_key_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
            allowed_mime_types: default_allowed_mime_types(),
            part_size_bytes: default_part_size_bytes(),
            uploader_id: None,
        }
    }
}

impl MediaConfig {
    /// Load the configuration from `MEDIA_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let config: MediaConfig = Config::builder()
            .add_source(
                Environment::with_prefix("MEDIA")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_mime_types"),
            )
            .build()
            .context("reading MEDIA_* environment")?
            .try_deserialize()
            .context("parsing media configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MEDIA_MAX_UPLOAD_BYTES must be greater than zero");
        }
        if self.allowed_mime_types.is_empty() {
            anyhow::bail!("MEDIA_ALLOWED_MIME_TYPES must name at least one type");
        }
        if self.part_size_bytes < MIN_PART_SIZE {
            anyhow::bail!(
                "MEDIA_PART_SIZE_BYTES must be at least {} bytes",
                MIN_PART_SIZE
            );
        }
        if self.key_prefix.trim_matches('/').is_empty() {
            anyhow::bail!("MEDIA_KEY_PREFIX must not be empty");
        }
        Ok(())
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_mime_types: self.allowed_mime_types.clone(),
            max_upload_bytes: self.max_upload_bytes,
            key_prefix: self.key_prefix.clone(),
        }
    }

    pub fn uploader(&self) -> Option<Principal> {
        self.uploader_id.map(Principal::new)
    }
}
