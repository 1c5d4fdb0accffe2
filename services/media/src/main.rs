use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use common::format_size;
use media::backend::Backend;
use media::config::MediaConfig;
use media::ports::StaticIdentity;
use media::probe::DurationProbe;
use media::{Envelope, UploadRequest, VideoBlob};

/// Operator CLI for the video catalog.
#[derive(Parser, Debug)]
#[command(author, version, about = "Upload and inspect catalog videos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local video file as MEDIA_UPLOADER_ID
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Override the MIME type guessed from the file name
        #[arg(long)]
        mime_type: Option<String>,
        /// Duration in seconds
        #[arg(long, conflicts_with = "probe")]
        duration: Option<f64>,
        /// Read the duration with ffprobe
        #[arg(long)]
        probe: bool,
    },
    /// List all videos, newest first
    List,
    /// Show one video
    Show { id: Uuid },
    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init_tracing()?;

    let cli = Cli::parse();
    let config = MediaConfig::from_env()?;
    let backend = Backend::connect(&config).await?;

    match cli.command {
        Command::Upload {
            path,
            title,
            description,
            mime_type,
            duration,
            probe,
        } => {
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            info!("Read {} ({})", file_name, format_size(data.len() as u64));

            let blob = match mime_type {
                Some(mime_type) => VideoBlob::new(file_name, mime_type, Bytes::from(data)),
                None => VideoBlob::guessed(file_name, Bytes::from(data)),
            };

            let duration = if probe {
                match DurationProbe::probe(&path).await {
                    Ok(seconds) => seconds,
                    Err(e) => {
                        warn!("Could not probe duration, recording 0: {}", e);
                        None
                    }
                }
            } else {
                duration
            };

            let mut request = UploadRequest::new(blob, title, description);
            if let Some(seconds) = duration {
                request = request.with_duration(seconds);
            }

            let identity = Arc::new(StaticIdentity::new(config.uploader()));
            let pipeline = backend.upload_pipeline(&config, identity);
            let on_progress = |percent: u8| info!("Upload progress: {}%", percent);

            let result = pipeline.upload_as_current(request, Some(&on_progress)).await;
            if let Some(key) = result.as_ref().err().and_then(|e| e.orphaned_key()) {
                warn!("Blob {} has no metadata record and needs cleanup", key);
            }
            print_envelope(Envelope::from(result))?;
        }
        Command::List => {
            let result = backend.catalog_reader().list_all().await;
            print_envelope(Envelope::from(result))?;
        }
        Command::Show { id } => {
            let result = backend.catalog_reader().get_by_id(id).await;
            print_envelope(Envelope::from(result))?;
        }
        Command::Migrate => match &backend.database {
            Some(database) => database.migrate().await?,
            None => warn!("In-memory backend has no schema to migrate"),
        },
    }

    Ok(())
}

fn print_envelope<T: Serialize>(envelope: Envelope<T>) -> Result<()> {
    let failed = !envelope.success;
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
