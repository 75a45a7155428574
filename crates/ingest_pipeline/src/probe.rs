//! Video probing (spec §4.8.1: "probes the blob ... for fps and
//! extension"). The source shells out to `ffmpeg.probe`/OpenCV; there
//! is no ffmpeg-binding crate in this workspace's dependency stack, so
//! the production implementation here shells out to the `ffprobe`
//! binary the same way, kept behind a trait so tests can substitute a
//! fixed-metadata fake.

use std::path::Path;

use ingest_error::{IngestResult, StorageError, StorageErrorKind};
use serde::Deserialize;

/// Metadata extracted from a source video file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    /// Frames per second.
    pub fps: f64,
}

/// Probes a local video file for metadata needed to build a `Video`
/// artifact.
#[async_trait::async_trait]
pub trait VideoProbe: Send + Sync {
    /// Inspect the file at `path` and return its metadata.
    async fn probe(&self, path: &Path) -> IngestResult<VideoMetadata>;
}

/// Shells out to `ffprobe -show_streams -print_format json`.
pub struct FfprobeVideoProbe;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    avg_frame_rate: Option<String>,
}

#[async_trait::async_trait]
impl VideoProbe for FfprobeVideoProbe {
    async fn probe(&self, path: &Path) -> IngestResult<VideoMetadata> {
        let output = tokio::process::Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?;

        if !output.status.success() {
            return Err(StorageError::new(StorageErrorKind::DataCorruption(format!(
                "ffprobe exited with status {}",
                output.status
            )))
            .into());
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ingest_error::JsonError::new(e.to_string()))?;

        let video_stream = parsed
            .streams
            .iter()
            .find(|s| s.codec_type == "video")
            .ok_or_else(|| StorageError::new(StorageErrorKind::DataCorruption("no video stream found".into())))?;

        let fps = video_stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .unwrap_or(0.0);

        Ok(VideoMetadata { fps })
    }
}

/// Parse an ffprobe `"num/den"` frame-rate string into a decimal fps.
fn parse_frame_rate(s: &str) -> Option<f64> {
    let mut parts = s.split('/');
    let num: f64 = parts.next()?.parse().ok()?;
    let den: f64 = parts.next().unwrap_or("1").parse().ok()?;
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// A probe returning a fixed, preconfigured FPS — used in tests and
/// where the caller already knows the source's frame rate.
pub struct FixedVideoProbe(pub f64);

#[async_trait::async_trait]
impl VideoProbe for FixedVideoProbe {
    async fn probe(&self, _path: &Path) -> IngestResult<VideoMetadata> {
        Ok(VideoMetadata { fps: self.0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fractional_frame_rate() {
        assert_eq!(parse_frame_rate("30000/1001"), Some(30000.0 / 1001.0));
    }

    #[test]
    fn parses_integer_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
    }

    #[test]
    fn rejects_zero_denominator() {
        assert_eq!(parse_frame_rate("25/0"), None);
    }
}
