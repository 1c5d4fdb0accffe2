use crate::ports::{BlobStore, ByteProgress, StoredObject};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    primitives::ByteStream,
    types::{CompletedMultipartUpload, CompletedPart},
};
use bytes::Bytes;
use tracing::{error, info, warn};

/// S3 rejects multipart parts smaller than this, except the last one.
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Blob store writing video payloads to one S3 bucket.
#[derive(Clone)]
pub struct S3BlobStore {
    s3_client: Client,
    bucket: String,
    public_base_url: String,
    part_size: usize,
}

impl S3BlobStore {
    /// `public_base_url` defaults to the bucket's virtual-hosted endpoint.
    pub fn new(
        s3_client: Client,
        bucket: String,
        public_base_url: Option<String>,
        part_size: usize,
    ) -> Self {
        let public_base_url =
            public_base_url.unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", bucket));

        Self {
            s3_client,
            bucket,
            public_base_url,
            part_size: part_size.max(MIN_PART_SIZE),
        }
    }

    async fn put_single(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<()> {
        let total = data.len() as u64;
        progress(0, total);

        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("putting s3://{}/{}", self.bucket, key))?;

        progress(total, total);
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<()> {
        let created = self
            .s3_client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .with_context(|| format!("starting multipart upload of {}", key))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| anyhow!("S3 returned no upload id for {}", key))?
            .to_string();

        match self.upload_parts(key, &upload_id, data, progress).await {
            Ok(parts) => {
                self.s3_client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .with_context(|| format!("completing multipart upload of {}", key))?;
                Ok(())
            }
            Err(e) => {
                warn!("Aborting multipart upload of {}", key);
                if let Err(abort_err) = self
                    .s3_client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    error!("Failed to abort multipart upload of {}: {}", key, abort_err);
                }
                Err(e)
            }
        }
    }

    async fn upload_parts(
        &self,
        key: &str,
        upload_id: &str,
        data: Bytes,
        progress: &ByteProgress<'_>,
    ) -> Result<Vec<CompletedPart>> {
        let total = data.len() as u64;
        let mut parts = Vec::new();
        let mut offset = 0;

        progress(0, total);

        while offset < data.len() {
            let end = (offset + self.part_size).min(data.len());
            let part_number = i32::try_from(parts.len() + 1).context("too many parts")?;

            let uploaded = self
                .s3_client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(data.slice(offset..end)))
                .send()
                .await
                .with_context(|| format!("uploading part {} of {}", part_number, key))?;

            parts.push(
                CompletedPart::builder()
                    .e_tag(uploaded.e_tag().unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );

            offset = end;
            progress(offset as u64, total);
        }

        Ok(parts)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        progress: &ByteProgress<'_>,
    ) -> Result<StoredObject> {
        info!("Uploading video to S3: {}", key);

        if data.len() > self.part_size {
            self.put_multipart(key, data, content_type, progress).await?;
        } else {
            self.put_single(key, data, content_type, progress).await?;
        }

        Ok(StoredObject {
            key: key.to_string(),
        })
    }

    fn public_url_for(&self, key: &str) -> Result<String> {
        public_url(&self.public_base_url, key)
    }
}

fn public_url(base: &str, key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(anyhow!("cannot build a public URL for an empty key"));
    }
    if base.is_empty() {
        return Err(anyhow!("no public base URL configured"));
    }

    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    ))
}
