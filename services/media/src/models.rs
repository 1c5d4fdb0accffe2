use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PLACEHOLDER_DISPLAY_NAME: &str = "Unknown User";
pub const PLACEHOLDER_EMAIL: &str = "unknown@email.com";

/// Metadata record of an uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub public_url: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// A media record before the metadata store has assigned its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMediaAsset {
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub mime_type: String,
    pub storage_path: String,
    pub public_url: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl NewMediaAsset {
    pub fn with_id(self, id: Uuid) -> MediaAsset {
        MediaAsset {
            id,
            title: self.title,
            description: self.description,
            file_name: self.file_name,
            file_size_bytes: self.file_size_bytes,
            mime_type: self.mime_type,
            storage_path: self.storage_path,
            public_url: self.public_url,
            owner_id: self.owner_id,
            created_at: self.created_at,
            duration_seconds: self.duration_seconds,
        }
    }
}

/// Public profile of the principal owning a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
}

impl OwnerProfile {
    /// Stand-in used when the owner's profile cannot be resolved.
    pub fn placeholder(owner_id: Uuid) -> Self {
        Self {
            id: owner_id,
            display_name: PLACEHOLDER_DISPLAY_NAME.to_string(),
            email: PLACEHOLDER_EMAIL.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.display_name == PLACEHOLDER_DISPLAY_NAME && self.email == PLACEHOLDER_EMAIL
    }
}

/// The authenticated identity performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: Option<String>,
}

impl Principal {
    pub fn new(id: Uuid) -> Self {
        Self { id, email: None }
    }
}

/// An incoming video file.
#[derive(Debug, Clone)]
pub struct VideoBlob {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl VideoBlob {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Build a blob whose MIME type is guessed from the file name.
    pub fn guessed(file_name: impl Into<String>, data: Bytes) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        Self {
            file_name,
            mime_type,
            data,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Everything the caller supplies for one upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub blob: VideoBlob,
    pub title: String,
    pub description: String,
    pub duration_seconds: Option<f64>,
}

impl UploadRequest {
    pub fn new(blob: VideoBlob, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            blob,
            title: title.into(),
            description: description.into(),
            duration_seconds: None,
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub asset_id: Uuid,
    pub public_url: String,
    pub storage_path: String,
}

/// A media record paired with its owner's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub asset: MediaAsset,
    pub profile: OwnerProfile,
}

/// How completely a listing was enriched with owner profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Enrichment {
    Complete,
    Degraded { reason: String },
}

/// The catalog, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogListing {
    pub entries: Vec<CatalogEntry>,
    pub enrichment: Enrichment,
}

impl CatalogListing {
    pub fn is_degraded(&self) -> bool {
        matches!(self.enrichment, Enrichment::Degraded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_profile_keeps_owner_id() {
        let owner = Uuid::new_v4();
        let profile = OwnerProfile::placeholder(owner);

        assert_eq!(profile.id, owner);
        assert_eq!(profile.display_name, "Unknown User");
        assert_eq!(profile.email, "unknown@email.com");
        assert!(profile.is_placeholder());
    }

    #[test]
    fn guesses_video_mime_types_from_file_names() {
        let cases = [
            ("clip.mp4", "video/mp4"),
            ("clip.mov", "video/quicktime"),
            ("clip.avi", "video/x-msvideo"),
            ("clip.mpeg", "video/mpeg"),
        ];

        for (name, expected) in cases {
            let blob = VideoBlob::guessed(name, Bytes::from_static(b"x"));
            assert_eq!(blob.mime_type, expected, "{}", name);
        }

        let unknown = VideoBlob::guessed("notes", Bytes::new());
        assert_eq!(unknown.mime_type, "application/octet-stream");
    }

    #[test]
    fn catalog_entry_flattens_asset_fields() {
        let owner = Uuid::new_v4();
        let entry = CatalogEntry {
            asset: NewMediaAsset {
                title: "Sunset".to_string(),
                description: String::new(),
                file_name: "sunset.mp4".to_string(),
                file_size_bytes: 42,
                mime_type: "video/mp4".to_string(),
                storage_path: "videos/x/1.mp4".to_string(),
                public_url: "https://cdn.example.com/videos/x/1.mp4".to_string(),
                owner_id: owner,
                created_at: Utc::now(),
                duration_seconds: 0.0,
            }
            .with_id(Uuid::new_v4()),
            profile: OwnerProfile::placeholder(owner),
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["title"], "Sunset");
        assert_eq!(json["profile"]["display_name"], "Unknown User");
    }

    #[test]
    fn enrichment_is_tagged() {
        let degraded = Enrichment::Degraded {
            reason: "identity store offline".to_string(),
        };
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "identity store offline");
    }
}
