//! SegmentCaption stage (spec §4.8.5): for each Autoshot segment,
//! compute the related ASR text, sample frames uniformly from the
//! segment, and caption the segment with an LLM call.

use std::sync::Arc;

use async_stream::stream;
use base64::Engine;
use ingest_artifact::{Artifact, PersistenceVisitor, SegmentCaptionArtifact, Payload};
use ingest_core::{uniform_frame_indices, FrameSpan};
use ingest_error::{IngestResult, JsonError, StorageError, StorageErrorKind};
use ingest_registry::ServiceClient;

use crate::common::VideoRef;
use crate::contracts::{LlmRequest, LlmResponse};
use crate::frame::FrameExtractor;
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

const PROMPT_TEMPLATE: &str = "Describe what happens in this video segment. \
Related transcript:\n{asr}";

/// One video's Autoshot + ASR output, ready for captioning.
#[derive(Debug, Clone)]
pub struct SegmentCaptionInput {
    /// The video the segments belong to.
    pub video: VideoRef,
    /// Content-addressed id of the parent Autoshot artifact.
    pub autoshot_artifact_id: String,
    /// Blob key the segments json was written under.
    pub segments_object_key: String,
    /// Blob key the ASR transcript json was written under, if ASR ran.
    pub asr_object_key: Option<String>,
}

/// Descriptor for one segment's caption.
#[derive(Debug, Clone)]
pub struct SegmentCaptionDescriptor {
    video: VideoRef,
    parent_artifact_id: String,
    start_frame: i64,
    end_frame: i64,
    related_asr_text: String,
    frames_base64: Vec<String>,
}

/// The SegmentCaption stage.
pub struct SegmentCaptionTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
    extractor: Arc<dyn FrameExtractor>,
    images_per_segment: usize,
    http: reqwest::Client,
}

impl SegmentCaptionTask {
    /// Build the stage. `images_per_segment` is the number of frames
    /// sampled per segment to accompany the LLM prompt.
    pub fn new(
        visitor: PersistenceVisitor,
        client: ServiceClient,
        config: TaskConfig,
        extractor: Arc<dyn FrameExtractor>,
        images_per_segment: usize,
    ) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
            extractor,
            images_per_segment,
            http: reqwest::Client::new(),
        }
    }

    fn empty_artifact(&self, descriptor: &SegmentCaptionDescriptor) -> Artifact {
        Artifact::SegmentCaption(SegmentCaptionArtifact {
            video_id: descriptor.video.video_id.clone(),
            user_bucket: descriptor.video.user_bucket.clone(),
            parent_artifact_id: descriptor.parent_artifact_id.clone(),
            start_frame: descriptor.start_frame,
            end_frame: descriptor.end_frame,
            caption: String::new(),
            related_asr_text: descriptor.related_asr_text.clone(),
        })
    }

    async fn fetch_json(&self, bucket: &str, key: &str) -> IngestResult<serde_json::Value> {
        self.visitor
            .blob_store()
            .get_json(bucket, key)
            .await?
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(key.to_string())).into())
    }

    async fn sample_frames_base64(
        &self,
        blob_url: &str,
        extension: &str,
        fps: f64,
        start_frame: i64,
        end_frame: i64,
    ) -> IngestResult<Vec<String>> {
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

        let mut frames = Vec::new();
        for frame_index in uniform_frame_indices(start_frame, end_frame, self.images_per_segment) {
            let timestamp = if fps > 0.0 { frame_index as f64 / fps } else { 0.0 };
            let webp = self.extractor.extract_webp(&path, timestamp).await?;
            frames.push(base64::engine::general_purpose::STANDARD.encode(webp));
        }
        Ok(frames)
    }
}

#[async_trait::async_trait]
impl Task for SegmentCaptionTask {
    type Input = Vec<SegmentCaptionInput>;
    type Descriptor = SegmentCaptionDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        let mut descriptors = Vec::new();
        for item in input {
            let segments_value = self
                .fetch_json(&item.video.user_bucket, &item.segments_object_key)
                .await?;
            let segments: Vec<(i64, i64)> = serde_json::from_value(segments_value["segments"].clone())
                .map_err(|e| JsonError::new(e.to_string()))?;

            let tokens: Vec<(i64, i64, String)> = match &item.asr_object_key {
                Some(key) => {
                    let value = self.fetch_json(&item.video.user_bucket, key).await?;
                    let raw: Vec<serde_json::Value> = serde_json::from_value(value["tokens"].clone())
                        .map_err(|e| JsonError::new(e.to_string()))?;
                    raw.into_iter()
                        .filter_map(|t| {
                            Some((
                                t.get("start_frame")?.as_i64()?,
                                t.get("end_frame")?.as_i64()?,
                                t.get("text")?.as_str()?.to_string(),
                            ))
                        })
                        .collect()
                }
                None => Vec::new(),
            };

            for (start, end) in segments {
                let segment_span = FrameSpan::new(start, end);
                let related_asr_text = tokens
                    .iter()
                    .filter(|(tsf, tef, _)| FrameSpan::new(*tsf, *tef).is_related_to(&segment_span))
                    .map(|(_, _, text)| text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");

                let frames_base64 = self
                    .sample_frames_base64(
                        &item.video.blob_url,
                        item.video.blob_url.rsplit('.').next().unwrap_or("mp4"),
                        item.video.fps,
                        start,
                        end,
                    )
                    .await?;

                descriptors.push(SegmentCaptionDescriptor {
                    video: item.video.clone(),
                    parent_artifact_id: item.autoshot_artifact_id.clone(),
                    start_frame: start,
                    end_frame: end,
                    related_asr_text,
                    frames_base64,
                });
            }
        }
        Ok(descriptors)
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for descriptor in descriptors {
                let probe = self.empty_artifact(&descriptor);
                match self.visitor.exists(&probe).await {
                    Ok(true) => yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped }),
                    Ok(false) => {
                        let prompt = PROMPT_TEMPLATE.replace("{asr}", &descriptor.related_asr_text);
                        let req = LlmRequest {
                            prompt: &prompt,
                            image_base64: descriptor.frames_base64.clone(),
                            metadata: serde_json::json!({ "video_id": descriptor.video.video_id }),
                        };
                        let result: IngestResult<LlmResponse> = ingest_registry::scoped_model(
                            &self.client,
                            &self.config.model_name,
                            || self.client.invoke("/infer", &req),
                        )
                        .await;
                        match result {
                            Ok(resp) => yield Ok(WorkItem {
                                descriptor,
                                outcome: Outcome::Produced(Payload::Json(serde_json::json!({
                                    "caption": resp.answer,
                                }))),
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
            Outcome::Produced(payload) => {
                let caption = match &payload {
                    Payload::Json(value) => value["caption"].as_str().unwrap_or_default().to_string(),
                    _ => String::new(),
                };
                let artifact = Artifact::SegmentCaption(SegmentCaptionArtifact {
                    video_id: item.descriptor.video.video_id.clone(),
                    user_bucket: item.descriptor.video.user_bucket.clone(),
                    parent_artifact_id: item.descriptor.parent_artifact_id.clone(),
                    start_frame: item.descriptor.start_frame,
                    end_frame: item.descriptor.end_frame,
                    caption,
                    related_asr_text: item.descriptor.related_asr_text.clone(),
                });
                self.visitor.persist(&artifact, payload).await?;
                Ok(item.descriptor)
            }
        }
    }
}
