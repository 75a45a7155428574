//! ImageCaption stage (spec §4.8.6): caption each extracted keyframe
//! with a fixed per-image LLM prompt.

use async_stream::stream;
use base64::Engine;
use ingest_artifact::{Artifact, ImageCaptionArtifact, Payload, PersistenceVisitor};
use ingest_error::{IngestResult, StorageError, StorageErrorKind};
use ingest_registry::ServiceClient;

use crate::common::VideoRef;
use crate::contracts::{LlmRequest, LlmResponse};
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

const PROMPT: &str = "Describe the contents of this image in one or two sentences.";

/// One Image artifact ready to be captioned.
#[derive(Debug, Clone)]
pub struct ImageCaptionInput {
    /// The video the frame belongs to.
    pub video: VideoRef,
    /// Content-addressed id of the parent `Image` artifact.
    pub image_artifact_id: String,
    /// Index of the frame within the video.
    pub frame_index: i64,
    /// Blob key the frame's WebP bytes were written under.
    pub image_object_key: String,
}

/// Descriptor for one image's caption.
#[derive(Debug, Clone)]
pub struct ImageCaptionDescriptor {
    video: VideoRef,
    image_artifact_id: String,
    frame_index: i64,
    image_object_key: String,
}

/// The ImageCaption stage.
pub struct ImageCaptionTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
}

impl ImageCaptionTask {
    /// Build the stage over a service client bound to the LLM
    /// microservice.
    pub fn new(visitor: PersistenceVisitor, client: ServiceClient, config: TaskConfig) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
        }
    }

    fn empty_artifact(&self, descriptor: &ImageCaptionDescriptor) -> Artifact {
        Artifact::ImageCaption(ImageCaptionArtifact {
            video_id: descriptor.video.video_id.clone(),
            user_bucket: descriptor.video.user_bucket.clone(),
            parent_artifact_id: descriptor.image_artifact_id.clone(),
            frame_index: descriptor.frame_index,
            caption: String::new(),
        })
    }
}

#[async_trait::async_trait]
impl Task for ImageCaptionTask {
    type Input = Vec<ImageCaptionInput>;
    type Descriptor = ImageCaptionDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input
            .into_iter()
            .map(|item| ImageCaptionDescriptor {
                video: item.video,
                image_artifact_id: item.image_artifact_id,
                frame_index: item.frame_index,
                image_object_key: item.image_object_key,
            })
            .collect())
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for descriptor in descriptors {
                let probe = self.empty_artifact(&descriptor);
                match self.visitor.exists(&probe).await {
                    Ok(true) => yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped }),
                    Ok(false) => {
                        let bytes_result = self
                            .visitor
                            .blob_store()
                            .get_object(&descriptor.video.user_bucket, &descriptor.image_object_key)
                            .await;
                        let bytes = match bytes_result {
                            Ok(Some(bytes)) => bytes,
                            Ok(None) => {
                                yield Err(StorageError::new(StorageErrorKind::NotFound(
                                    descriptor.image_object_key.clone(),
                                ))
                                .into());
                                continue;
                            }
                            Err(e) => { yield Err(e); continue; }
                        };
                        let image_base64 = base64::engine::general_purpose::STANDARD.encode(bytes);
                        let req = LlmRequest {
                            prompt: PROMPT,
                            image_base64: vec![image_base64],
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
                let artifact = Artifact::ImageCaption(ImageCaptionArtifact {
                    video_id: item.descriptor.video.video_id.clone(),
                    user_bucket: item.descriptor.video.user_bucket.clone(),
                    parent_artifact_id: item.descriptor.image_artifact_id.clone(),
                    frame_index: item.descriptor.frame_index,
                    caption,
                });
                self.visitor.persist(&artifact, payload).await?;
                Ok(item.descriptor)
            }
        }
    }
}
