//! ImageExtract stage (spec §4.8.4): for each Autoshot segment, sample
//! `n_per_segment` evenly spaced frames, extract and encode them as
//! WebP, and emit one Image artifact per chosen frame.

use std::sync::Arc;

use async_stream::stream;
use ingest_artifact::{Artifact, ImageArtifact, Payload, PersistenceVisitor};
use ingest_core::{sha256_hex, uniform_frame_indices};
use ingest_error::{IngestResult, JsonError, StorageError, StorageErrorKind};

use crate::common::VideoRef;
use crate::frame::FrameExtractor;
use crate::task::{Outcome, Task, WorkItem, WorkStream};

/// One video's Autoshot output, ready for frame extraction.
#[derive(Debug, Clone)]
pub struct AutoshotRef {
    /// The video the segments belong to.
    pub video: VideoRef,
    /// Content-addressed id of the Autoshot artifact.
    pub autoshot_artifact_id: String,
    /// Blob key the segments json was written under.
    pub object_key: String,
}

/// Descriptor for one candidate frame.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// The video this frame belongs to.
    pub video: VideoRef,
    /// Content-addressed id of the parent Autoshot artifact.
    pub segment_parent_id: String,
    /// Index of the frame within the video.
    pub frame_index: i64,
}

/// The ImageExtract stage.
pub struct ImageExtractTask {
    visitor: PersistenceVisitor,
    extractor: Arc<dyn FrameExtractor>,
    http: reqwest::Client,
    n_per_segment: usize,
}

impl ImageExtractTask {
    /// Build the stage. `n_per_segment` is the number of evenly spaced
    /// frames sampled per Autoshot segment.
    pub fn new(
        visitor: PersistenceVisitor,
        extractor: Arc<dyn FrameExtractor>,
        n_per_segment: usize,
    ) -> Self {
        Self {
            visitor,
            extractor,
            http: reqwest::Client::new(),
            n_per_segment,
        }
    }

    async fn fetch_segments(&self, bucket: &str, object_key: &str) -> IngestResult<Vec<(i64, i64)>> {
        let value = self
            .visitor
            .blob_store()
            .get_json(bucket, object_key)
            .await?
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(object_key.to_string())))?;
        serde_json::from_value(value["segments"].clone()).map_err(|e| JsonError::new(e.to_string()).into())
    }

    fn empty_artifact(&self, descriptor: &ImageDescriptor, checksum: &str) -> Artifact {
        Artifact::Image(ImageArtifact {
            video_id: descriptor.video.video_id.clone(),
            user_bucket: descriptor.video.user_bucket.clone(),
            segment_parent_id: descriptor.segment_parent_id.clone(),
            frame_index: descriptor.frame_index,
            timestamp: frame_timestamp(descriptor.frame_index, descriptor.video.fps),
            checksum: checksum.to_string(),
        })
    }

    async fn download_source(&self, blob_url: &str, extension: &str) -> IngestResult<tempfile::TempDir> {
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
        Ok(dir)
    }
}

fn frame_timestamp(frame_index: i64, fps: f64) -> f64 {
    if fps <= 0.0 {
        0.0
    } else {
        frame_index as f64 / fps
    }
}

#[async_trait::async_trait]
impl Task for ImageExtractTask {
    type Input = Vec<AutoshotRef>;
    type Descriptor = ImageDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        let mut descriptors = Vec::new();
        for autoshot in input {
            let segments = self
                .fetch_segments(&autoshot.video.user_bucket, &autoshot.object_key)
                .await?;
            for (start, end) in segments {
                for frame_index in uniform_frame_indices(start, end, self.n_per_segment) {
                    descriptors.push(ImageDescriptor {
                        video: autoshot.video.clone(),
                        segment_parent_id: autoshot.autoshot_artifact_id.clone(),
                        frame_index,
                    });
                }
            }
        }
        Ok(descriptors)
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            // Reuse one local copy of the source video across every
            // frame pulled from it instead of re-downloading per frame.
            let mut current_video_id: Option<String> = None;
            let mut current_dir: Option<tempfile::TempDir> = None;

            for descriptor in descriptors {
                if current_video_id.as_deref() != Some(descriptor.video.video_id.as_str()) {
                    let extension = descriptor.video.blob_url.rsplit('.').next().unwrap_or("mp4");
                    match self.download_source(&descriptor.video.blob_url, extension).await {
                        Ok(dir) => {
                            current_dir = Some(dir);
                            current_video_id = Some(descriptor.video.video_id.clone());
                        }
                        Err(e) => {
                            yield Err(e);
                            continue;
                        }
                    }
                }

                let Some(dir) = current_dir.as_ref() else { continue };
                let source_path = match std::fs::read_dir(dir.path()).ok().and_then(|mut rd| rd.next()) {
                    Some(Ok(entry)) => entry.path(),
                    _ => {
                        yield Err(StorageError::new(StorageErrorKind::NotFound("source video".into())).into());
                        continue;
                    }
                };

                let timestamp = frame_timestamp(descriptor.frame_index, descriptor.video.fps);
                match self.extractor.extract_webp(&source_path, timestamp).await {
                    Ok(bytes) => {
                        let checksum = sha256_hex(&bytes);
                        let probe = self.empty_artifact(&descriptor, &checksum);
                        match self.visitor.exists(&probe).await {
                            Ok(true) => yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped }),
                            Ok(false) => yield Ok(WorkItem {
                                descriptor,
                                outcome: Outcome::Produced(Payload::Bytes(bytes)),
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
        match item.outcome {
            Outcome::Skipped => Ok(item.descriptor),
            Outcome::Produced(Payload::Bytes(bytes)) => {
                let checksum = sha256_hex(&bytes);
                let artifact = self.empty_artifact(&item.descriptor, &checksum);
                self.visitor.persist(&artifact, Payload::Bytes(bytes)).await?;
                Ok(item.descriptor)
            }
            Outcome::Produced(_) => Ok(item.descriptor),
        }
    }
}
