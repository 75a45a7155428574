//! Ingest stage (spec §4.8.1): probe each submitted video for `fps`
//! and `extension`, emit one `Video` artifact per entry. Idempotent on
//! `video_id`.

use std::sync::Arc;

use async_stream::stream;
use ingest_artifact::{Artifact, Payload, PersistenceVisitor, VideoArtifact};
use ingest_error::{IngestResult, StorageError, StorageErrorKind};

use crate::probe::VideoProbe;
use crate::task::{Outcome, Task, WorkItem, WorkStream};

/// One video submitted for ingestion.
#[derive(Debug, Clone)]
pub struct VideoSubmission {
    /// The video's external identifier.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// External location of the source video.
    pub blob_url: String,
}

/// Descriptor carried through `execute`/`postprocess` for one video.
#[derive(Debug, Clone)]
pub struct IngestDescriptor {
    /// The submission this descriptor was built from.
    pub submission: VideoSubmission,
    /// File extension extracted from `blob_url`.
    pub extension: String,
}

/// The Ingest stage.
pub struct IngestTask {
    visitor: PersistenceVisitor,
    probe: Arc<dyn VideoProbe>,
    http: reqwest::Client,
}

impl IngestTask {
    /// Build the stage over the given visitor and video prober.
    pub fn new(visitor: PersistenceVisitor, probe: Arc<dyn VideoProbe>) -> Self {
        Self {
            visitor,
            probe,
            http: reqwest::Client::new(),
        }
    }

    fn artifact_for(&self, descriptor: &IngestDescriptor, fps: f64) -> Artifact {
        Artifact::Video(VideoArtifact {
            video_id: descriptor.submission.video_id.clone(),
            user_bucket: descriptor.submission.user_bucket.clone(),
            blob_url: descriptor.submission.blob_url.clone(),
            extension: descriptor.extension.clone(),
            fps,
        })
    }

    async fn fetch_and_probe(&self, blob_url: &str, extension: &str) -> IngestResult<f64> {
        let bytes = self
            .http
            .get(blob_url)
            .send()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?
            .bytes()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Unavailable(e.to_string())))?;

        let dir = tempfile::tempdir()
            .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(e.to_string())))?;
        let path = dir.path().join(format!("source.{extension}"));
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(e.to_string())))?;

        let metadata = self.probe.probe(&path).await?;
        Ok(metadata.fps)
    }
}

#[async_trait::async_trait]
impl Task for IngestTask {
    type Input = Vec<VideoSubmission>;
    type Descriptor = IngestDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input
            .into_iter()
            .map(|submission| {
                let extension = extract_extension(&submission.blob_url);
                IngestDescriptor { submission, extension }
            })
            .collect())
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for descriptor in descriptors {
                let probe_artifact = self.artifact_for(&descriptor, 0.0);
                match self.visitor.exists(&probe_artifact).await {
                    Ok(true) => {
                        yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped });
                    }
                    Ok(false) => {
                        let fps = self
                            .fetch_and_probe(&descriptor.submission.blob_url, &descriptor.extension)
                            .await;
                        match fps {
                            // Video's own payload lives entirely in the lineage row
                            // (spec §3.1: `blob_url` is externally supplied, never
                            // copied into our bucket); `fps` rides along as a sidecar
                            // JSON value so postprocess doesn't need to re-probe.
                            Ok(fps) => yield Ok(WorkItem {
                                descriptor: descriptor.clone(),
                                outcome: Outcome::Produced(Payload::Json(serde_json::json!({ "fps": fps }))),
                            }),
                            Err(e) => yield Err(e),
                        }
                    }
                    Err(e) => yield Err(e),
                }
            }
        })
    }

    async fn postprocess(&self, item: WorkItem<Self::Descriptor>) -> IngestResult<Self::Descriptor> {
        match &item.outcome {
            Outcome::Skipped => Ok(item.descriptor),
            Outcome::Produced(Payload::Json(value)) => {
                let fps = value
                    .get("fps")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0);
                let artifact = self.artifact_for(&item.descriptor, fps);
                self.visitor.persist(&artifact, Payload::None).await?;
                Ok(item.descriptor)
            }
            Outcome::Produced(_) => Ok(item.descriptor),
        }
    }
}

fn extract_extension(blob_url: &str) -> String {
    blob_url
        .rsplit('.')
        .next()
        .filter(|ext| !ext.contains('/'))
        .unwrap_or("mp4")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_extension_from_url() {
        assert_eq!(extract_extension("s3://bucket/video.mp4"), "mp4");
    }

    #[test]
    fn falls_back_when_no_extension_present() {
        assert_eq!(extract_extension("s3://bucket/video"), "mp4");
    }
}
