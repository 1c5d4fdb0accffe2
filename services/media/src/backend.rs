//! Wiring of concrete collaborators into the pipeline components

use std::sync::Arc;

use anyhow::Result;
use aws_config::BehaviorVersion;
use common::database::{DatabaseConfig, init_pool};
use tracing::info;

use crate::catalog::CatalogReader;
use crate::config::{BackendKind, MediaConfig};
use crate::database::Database;
use crate::memory::{InMemoryBlobStore, InMemoryCatalogStore};
use crate::pipeline::UploadPipeline;
use crate::ports::{BlobStore, IdentityProvider, MetadataStore, ProfileStore};
use crate::s3_store::S3BlobStore;

/// Collaborator handles shared by the upload pipeline and catalog reader.
#[derive(Clone)]
pub struct Backend {
    pub blobs: Arc<dyn BlobStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub profiles: Arc<dyn ProfileStore>,
    /// Present when metadata lives in PostgreSQL.
    pub database: Option<Database>,
}

impl Backend {
    /// Connect to the stores selected by `config.backend`.
    pub async fn connect(config: &MediaConfig) -> Result<Self> {
        match config.backend {
            BackendKind::S3 => {
                let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
                let s3_client = aws_sdk_s3::Client::new(&aws);
                let blobs = S3BlobStore::new(
                    s3_client,
                    config.bucket_name.clone(),
                    config.public_base_url.clone(),
                    config.part_size_bytes,
                );

                let db_config = DatabaseConfig::from_env()?;
                let pool = init_pool(&db_config).await?;
                let database = Database::new(pool);

                info!("Using S3 bucket {} with PostgreSQL metadata", config.bucket_name);

                Ok(Self {
                    blobs: Arc::new(blobs),
                    metadata: Arc::new(database.clone()),
                    profiles: Arc::new(database.clone()),
                    database: Some(database),
                })
            }
            BackendKind::Memory => {
                info!("Using in-memory media backend");
                Ok(Self::in_memory(config))
            }
        }
    }

    pub fn in_memory(config: &MediaConfig) -> Self {
        let base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| "memory://media".to_string());
        let catalog = InMemoryCatalogStore::new();

        Self {
            blobs: Arc::new(InMemoryBlobStore::new(base_url)),
            metadata: Arc::new(catalog.clone()),
            profiles: Arc::new(catalog),
            database: None,
        }
    }

    pub fn upload_pipeline(
        &self,
        config: &MediaConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> UploadPipeline {
        UploadPipeline::new(
            self.blobs.clone(),
            self.metadata.clone(),
            identity,
            config.upload_policy(),
        )
    }

    pub fn catalog_reader(&self) -> CatalogReader {
        CatalogReader::new(self.metadata.clone(), self.profiles.clone())
    }
}
