use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

mod error;
mod middleware;
mod routes;
mod settings;
mod state;

use media::backend::Backend;
use media::config::MediaConfig;
use media::ports::StaticIdentity;

use crate::{middleware::JwtVerifier, settings::ApiConfig, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init_tracing()?;

    info!("Starting API service");

    let api_config = ApiConfig::from_env()?;
    let media_config = MediaConfig::from_env()?;
    let backend = Backend::connect(&media_config).await?;

    let db_pool = backend.database.as_ref().map(|db| db.pool().clone());
    if let Some(pool) = &db_pool {
        if common::database::health_check(pool).await? {
            info!("Database connection successful");
        } else {
            anyhow::bail!("Failed to connect to database");
        }
    }

    let jwt = JwtVerifier::from_env()?;
    if jwt.is_none() {
        warn!("No JWT_PUBLIC_KEY or JWT_SECRET set; uploads will be rejected as unauthenticated");
    }

    // Principals come from the request, never from process-wide state.
    let pipeline = backend.upload_pipeline(&media_config, Arc::new(StaticIdentity::default()));

    let app_state = AppState {
        db_pool,
        pipeline: Arc::new(pipeline),
        catalog: Arc::new(backend.catalog_reader()),
        jwt,
        max_body_bytes: settings::body_limit_for(media_config.max_upload_bytes),
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&api_config.bind_addr).await?;
    info!("API service listening on {}", api_config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
