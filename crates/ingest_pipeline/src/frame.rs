//! Frame extraction (spec §4.8.4: "extracts each frame ... and encodes
//! as WebP with quality 90"). Like [`crate::probe`], there is no
//! video-codec crate in this workspace's dependency stack, so the
//! production implementation shells out to `ffmpeg`.

use std::path::Path;

use ingest_error::{IngestResult, StorageError, StorageErrorKind};

/// Extracts a single frame from a local video file as encoded WebP
/// bytes.
#[async_trait::async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Grab the frame nearest `timestamp_secs` and encode it as WebP
    /// at quality 90.
    async fn extract_webp(&self, video_path: &Path, timestamp_secs: f64) -> IngestResult<Vec<u8>>;
}

/// Shells out to `ffmpeg -ss <timestamp> -i <path> -frames:v 1`.
pub struct FfmpegFrameExtractor;

#[async_trait::async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    async fn extract_webp(&self, video_path: &Path, timestamp_secs: f64) -> IngestResult<Vec<u8>> {
        let output = tokio::process::Command::new("ffmpeg")
            .args(["-v", "quiet", "-ss"])
            .arg(format!("{timestamp_secs}"))
            .arg("-i")
            .arg(video_path)
            .args(["-frames:v", "1", "-c:v", "libwebp", "-quality", "90", "-f", "webp", "pipe:1"])
            .output()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?;

        if !output.status.success() || output.stdout.is_empty() {
            return Err(StorageError::new(StorageErrorKind::DataCorruption(format!(
                "ffmpeg frame extraction failed at {timestamp_secs}s"
            )))
            .into());
        }

        Ok(output.stdout)
    }
}

/// A fixed-bytes extractor for tests.
pub struct FixedFrameExtractor(pub Vec<u8>);

#[async_trait::async_trait]
impl FrameExtractor for FixedFrameExtractor {
    async fn extract_webp(&self, _video_path: &Path, _timestamp_secs: f64) -> IngestResult<Vec<u8>> {
        Ok(self.0.clone())
    }
}
