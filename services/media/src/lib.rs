//! Video upload and catalog pipeline
//!
//! Validates and stores uploaded video blobs, records their metadata, and
//! lists the catalog enriched with each owner's public profile. Storage,
//! identity and the metadata database are injected collaborators (see
//! [`ports`]); this crate only orchestrates them.

pub mod backend;
pub mod catalog;
pub mod config;
pub mod database;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod models;
pub mod pipeline;
pub mod ports;
pub mod probe;
pub mod s3_store;
pub mod storage_key;

pub use catalog::CatalogReader;
pub use envelope::Envelope;
pub use error::{ErrorKind, MediaError, MediaResult};
pub use models::{
    CatalogEntry, CatalogListing, Enrichment, MediaAsset, NewMediaAsset, OwnerProfile, Principal,
    UploadReceipt, UploadRequest, VideoBlob,
};
pub use pipeline::{UploadPipeline, UploadPolicy};
