use crate::models::{MediaAsset, NewMediaAsset, OwnerProfile};
use crate::ports::{MetadataStore, ProfileStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

const VIDEO_COLUMNS: &str = "id, title, description, file_name, file_size, mime_type, \
     storage_path, public_url, owner_id, created_at, duration_seconds";

/// PostgreSQL-backed `videos` and `profiles` tables.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DatabaseError::Migration)?;

        info!("Database migrations applied");
        Ok(())
    }
}

fn video_from_row(row: &PgRow) -> Result<MediaAsset> {
    let file_size: i64 = row.try_get("file_size")?;

    Ok(MediaAsset {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        file_name: row.try_get("file_name")?,
        file_size_bytes: u64::try_from(file_size)
            .with_context(|| format!("negative file size {}", file_size))?,
        mime_type: row.try_get("mime_type")?,
        storage_path: row.try_get("storage_path")?,
        public_url: row.try_get("public_url")?,
        owner_id: row.try_get("owner_id")?,
        created_at: row.try_get("created_at")?,
        duration_seconds: row.try_get("duration_seconds")?,
    })
}

#[async_trait]
impl MetadataStore for Database {
    async fn insert_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset> {
        let file_size = i64::try_from(asset.file_size_bytes)
            .context("file size does not fit the videos.file_size column")?;

        let row = sqlx::query(&format!(
            "INSERT INTO videos (title, description, file_name, file_size, mime_type, storage_path, public_url, owner_id, created_at, duration_seconds)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {}",
            VIDEO_COLUMNS
        ))
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.file_name)
        .bind(file_size)
        .bind(&asset.mime_type)
        .bind(&asset.storage_path)
        .bind(&asset.public_url)
        .bind(asset.owner_id)
        .bind(asset.created_at)
        .bind(asset.duration_seconds)
        .fetch_one(&self.pool)
        .await
        .context("inserting video record")?;

        video_from_row(&row)
    }

    async fn list_assets(&self) -> Result<Vec<MediaAsset>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM videos ORDER BY created_at DESC",
            VIDEO_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("listing videos")?;

        rows.iter().map(video_from_row).collect()
    }

    async fn find_asset_with_owner(
        &self,
        id: Uuid,
    ) -> Result<Option<(MediaAsset, Option<OwnerProfile>)>> {
        let row = sqlx::query(
            "SELECT v.id, v.title, v.description, v.file_name, v.file_size, v.mime_type,
                    v.storage_path, v.public_url, v.owner_id, v.created_at, v.duration_seconds,
                    p.id AS profile_id, p.display_name, p.email
             FROM videos v
             LEFT JOIN profiles p ON p.id = v.owner_id
             WHERE v.id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("loading video with owner profile")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let asset = video_from_row(&row)?;
        let profile_id: Option<Uuid> = row.try_get("profile_id")?;
        let profile = match profile_id {
            Some(profile_id) => Some(OwnerProfile {
                id: profile_id,
                display_name: row.try_get("display_name")?,
                email: row.try_get("email")?,
            }),
            None => None,
        };

        Ok(Some((asset, profile)))
    }
}

#[async_trait]
impl ProfileStore for Database {
    async fn profiles_by_ids(&self, ids: &[Uuid]) -> Result<Vec<OwnerProfile>> {
        let rows = sqlx::query("SELECT id, display_name, email FROM profiles WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .context("loading owner profiles")?;

        rows.into_iter()
            .map(|row| -> Result<OwnerProfile> {
                Ok(OwnerProfile {
                    id: row.try_get("id")?,
                    display_name: row.try_get("display_name")?,
                    email: row.try_get("email")?,
                })
            })
            .collect()
    }
}
