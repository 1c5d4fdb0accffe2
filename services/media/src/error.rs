//! Error taxonomy of the upload and catalog pipeline
//!
//! `Display` output is safe to show to end users. The collaborator failure
//! behind an I/O error is only reachable through `source()`.

use common::format_size;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MediaError {
    /// No authenticated principal was available.
    #[error("You must be logged in to upload videos")]
    Unauthenticated,

    #[error("Please select a valid video file (MP4, MOV, AVI, MPEG)")]
    InvalidFileType { mime_type: String },

    #[error("File size must be less than {}", limit_label(.limit_bytes))]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Failed to store the video file")]
    StorageWriteFailed {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// The blob was written but its record was not; `orphaned_key` still
    /// exists in the blob store.
    #[error("Failed to save video details")]
    MetadataWriteFailed {
        orphaned_key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to load videos")]
    MetadataReadFailed(#[source] anyhow::Error),

    #[error("Video not found")]
    NotFound(Uuid),

    #[error("Failed to load uploader profiles")]
    ProfileFetchFailed(#[source] anyhow::Error),

    #[error("Upload cancelled")]
    Cancelled { key: String },
}

/// Stable, machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    InvalidFileType,
    FileTooLarge,
    StorageWriteFailed,
    MetadataWriteFailed,
    MetadataReadFailed,
    NotFound,
    ProfileFetchFailed,
    Cancelled,
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Unauthenticated => ErrorKind::Unauthenticated,
            MediaError::InvalidFileType { .. } => ErrorKind::InvalidFileType,
            MediaError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            MediaError::StorageWriteFailed { .. } => ErrorKind::StorageWriteFailed,
            MediaError::MetadataWriteFailed { .. } => ErrorKind::MetadataWriteFailed,
            MediaError::MetadataReadFailed(_) => ErrorKind::MetadataReadFailed,
            MediaError::NotFound(_) => ErrorKind::NotFound,
            MediaError::ProfileFetchFailed(_) => ErrorKind::ProfileFetchFailed,
            MediaError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    /// Validation failures are reported before any collaborator is called.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MediaError::Unauthenticated
                | MediaError::InvalidFileType { .. }
                | MediaError::FileTooLarge { .. }
        )
    }

    /// Storage key left behind without a metadata record, if any.
    pub fn orphaned_key(&self) -> Option<&str> {
        match self {
            MediaError::MetadataWriteFailed { orphaned_key, .. } => Some(orphaned_key),
            _ => None,
        }
    }
}

pub type MediaResult<T> = Result<T, MediaError>;

fn limit_label(limit_bytes: &u64) -> String {
    format_size(*limit_bytes)
}
