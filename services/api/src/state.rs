//! Application state shared across handlers

use std::sync::Arc;

use media::{CatalogReader, UploadPipeline};
use sqlx::PgPool;

use crate::middleware::JwtVerifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Present when metadata lives in PostgreSQL
    pub db_pool: Option<PgPool>,
    pub pipeline: Arc<UploadPipeline>,
    pub catalog: Arc<CatalogReader>,
    pub jwt: Option<JwtVerifier>,
    /// Request body ceiling for uploads, above the pipeline's size limit
    pub max_body_bytes: usize,
}
