use anyhow::{Result, anyhow};
use std::path::Path;
use tokio::process::Command;
use tracing::{error, info};

/// Reads a video's duration with `ffprobe`.
pub struct DurationProbe;

impl DurationProbe {
    /// Duration in seconds, or `None` when the container does not report one.
    pub async fn probe(file_path: &Path) -> Result<Option<f64>> {
        info!("Probing duration of {}", file_path.display());

        let output = Command::new("ffprobe")
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(file_path)
            .output()
            .await?;

        if !output.status.success() {
            error!("ffprobe failed with status: {:?}", output.status);
            return Err(anyhow!("ffprobe failed"));
        }

        let ffprobe_data: serde_json::Value = serde_json::from_slice(&output.stdout)?;

        Ok(Self::parse_duration(&ffprobe_data))
    }

    /// Prefer the container duration, then the longest stream.
    pub fn parse_duration(ffprobe_data: &serde_json::Value) -> Option<f64> {
        let from_format = ffprobe_data
            .get("format")
            .and_then(|format| format.get("duration"))
            .and_then(as_seconds);

        if from_format.is_some() {
            return from_format;
        }

        ffprobe_data
            .get("streams")
            .and_then(|v| v.as_array())?
            .iter()
            .filter_map(|stream| stream.get("duration").and_then(as_seconds))
            .fold(None, |longest: Option<f64>, d| {
                Some(longest.map_or(d, |l| l.max(d)))
            })
    }
}

fn as_seconds(value: &serde_json::Value) -> Option<f64> {
    let seconds = match value {
        serde_json::Value::String(s) => s.parse::<f64>().ok()?,
        other => other.as_f64()?,
    };

    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}
