//! API service configuration read from `API_*` environment variables

use anyhow::{Context, Result};
use config::{Config, Environment};
use serde::Deserialize;

/// Multipart framing and text fields on top of the file itself.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Config::builder()
            .add_source(Environment::with_prefix("API"))
            .build()
            .context("reading API_* environment")?
            .try_deserialize()
            .context("parsing API configuration")
    }
}

/// Body limit for upload requests given the pipeline's file size limit.
pub fn body_limit_for(max_upload_bytes: u64) -> usize {
    usize::try_from(max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD_BYTES)
}
