//! ImageEmbedding stage (spec §4.8.7): batch images through the
//! image-embedding service and emit one embedding artifact per frame.

use async_stream::stream;
use base64::Engine;
use ingest_artifact::{Artifact, ImageEmbeddingArtifact, Payload, PersistenceVisitor};
use ingest_error::{IngestResult, StorageError, StorageErrorKind};
use ingest_registry::ServiceClient;

use crate::codec::encode_embedding;
use crate::common::VideoRef;
use crate::contracts::{ImageEmbedRequest, ImageEmbedResponse};
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

/// One Image artifact ready to be embedded.
#[derive(Debug, Clone)]
pub struct ImageEmbeddingInput {
    /// The video the frame belongs to.
    pub video: VideoRef,
    /// Content-addressed id of the parent `Image` artifact.
    pub image_artifact_id: String,
    /// Index of the frame within the video.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// Blob key the frame's WebP bytes were written under.
    pub image_object_key: String,
}

/// Descriptor for one frame's embedding.
#[derive(Debug, Clone)]
pub struct ImageEmbeddingDescriptor {
    video: VideoRef,
    image_artifact_id: String,
    frame_index: i64,
    timestamp: f64,
    image_object_key: String,
}

/// The ImageEmbedding stage.
pub struct ImageEmbeddingTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
}

impl ImageEmbeddingTask {
    /// Build the stage over a service client bound to the
    /// image-embedding microservice. `config.batch_size` bounds how
    /// many frames are sent per `/infer` call.
    pub fn new(visitor: PersistenceVisitor, client: ServiceClient, config: TaskConfig) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
        }
    }

    fn empty_artifact(&self, descriptor: &ImageEmbeddingDescriptor) -> Artifact {
        Artifact::ImageEmbedding(ImageEmbeddingArtifact {
            video_id: descriptor.video.video_id.clone(),
            user_bucket: descriptor.video.user_bucket.clone(),
            parent_artifact_id: descriptor.image_artifact_id.clone(),
            frame_index: descriptor.frame_index,
            timestamp: descriptor.timestamp,
            embedding: Vec::new(),
        })
    }

    async fn fetch_image_base64(&self, descriptor: &ImageEmbeddingDescriptor) -> IngestResult<String> {
        let bytes = self
            .visitor
            .blob_store()
            .get_object(&descriptor.video.user_bucket, &descriptor.image_object_key)
            .await?
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(descriptor.image_object_key.clone())))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

#[async_trait::async_trait]
impl Task for ImageEmbeddingTask {
    type Input = Vec<ImageEmbeddingInput>;
    type Descriptor = ImageEmbeddingDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input
            .into_iter()
            .map(|item| ImageEmbeddingDescriptor {
                video: item.video,
                image_artifact_id: item.image_artifact_id,
                frame_index: item.frame_index,
                timestamp: item.timestamp,
                image_object_key: item.image_object_key,
            })
            .collect())
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        let batch_size = self.config.batch_size.max(1);
        Box::pin(stream! {
            for chunk in descriptors.chunks(batch_size) {
                let mut pending = Vec::new();
                for descriptor in chunk {
                    match self.visitor.exists(&self.empty_artifact(descriptor)).await {
                        Ok(true) => yield Ok(WorkItem { descriptor: descriptor.clone(), outcome: Outcome::Skipped }),
                        Ok(false) => pending.push(descriptor.clone()),
                        Err(e) => yield Err(e),
                    }
                }
                if pending.is_empty() {
                    continue;
                }

                let mut image_base64 = Vec::with_capacity(pending.len());
                let mut fetch_failed = false;
                for descriptor in &pending {
                    match self.fetch_image_base64(descriptor).await {
                        Ok(encoded) => image_base64.push(encoded),
                        Err(e) => { yield Err(e); fetch_failed = true; break; }
                    }
                }
                if fetch_failed {
                    continue;
                }

                let req = ImageEmbedRequest {
                    image_base64: Some(image_base64),
                    text_input: None,
                    metadata: serde_json::json!({ "video_id": pending[0].video.video_id }),
                };
                let result: IngestResult<ImageEmbedResponse> = ingest_registry::scoped_model(
                    &self.client,
                    &self.config.model_name,
                    || self.client.invoke("/infer", &req),
                )
                .await;
                match result {
                    Ok(resp) => {
                        let embeddings = resp.image_embeddings.unwrap_or_default();
                        for (descriptor, embedding) in pending.into_iter().zip(embeddings.into_iter()) {
                            match encode_embedding(&embedding) {
                                Ok(bytes) => yield Ok(WorkItem {
                                    descriptor,
                                    outcome: Outcome::Produced(Payload::Bytes(bytes)),
                                }),
                                Err(e) => yield Err(e),
                            }
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
                let embedding = crate::codec::decode_embedding(&bytes)?;
                let artifact = Artifact::ImageEmbedding(ImageEmbeddingArtifact {
                    video_id: item.descriptor.video.video_id.clone(),
                    user_bucket: item.descriptor.video.user_bucket.clone(),
                    parent_artifact_id: item.descriptor.image_artifact_id.clone(),
                    frame_index: item.descriptor.frame_index,
                    timestamp: item.descriptor.timestamp,
                    embedding,
                });
                self.visitor.persist(&artifact, Payload::Bytes(bytes)).await?;
                Ok(item.descriptor)
            }
            Outcome::Produced(_) => Ok(item.descriptor),
        }
    }
}
