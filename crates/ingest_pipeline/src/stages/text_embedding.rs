//! TextEmbedding stages (spec §4.8.8): embed ImageCaption and
//! SegmentCaption text into the same vector space as image embeddings.
//! Both variants share one generic implementation parameterised by how
//! to build the right artifact kind.

use async_stream::stream;
use ingest_artifact::{
    Artifact, Payload, PersistenceVisitor, SegmentCaptionEmbeddingArtifact,
    TextCaptionEmbeddingArtifact,
};
use ingest_error::IngestResult;
use ingest_registry::ServiceClient;

use crate::codec::{decode_embedding, encode_embedding};
use crate::common::VideoRef;
use crate::contracts::{TextEmbedRequest, TextEmbedResponse};
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

/// One caption ready to be embedded.
#[derive(Debug, Clone)]
pub struct CaptionEmbeddingInput {
    /// The video the caption belongs to.
    pub video: VideoRef,
    /// Content-addressed id of the parent caption artifact.
    pub parent_artifact_id: String,
    /// The caption text to embed.
    pub text: String,
}

/// Descriptor for one caption's embedding.
#[derive(Debug, Clone)]
pub struct CaptionEmbeddingDescriptor {
    video: VideoRef,
    parent_artifact_id: String,
    text: String,
}

/// Which caption kind a [`TextEmbeddingTask`] targets, distinguishing
/// the artifact variant `postprocess` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionKind {
    /// Embeds `ImageCaption` text.
    ImageCaption,
    /// Embeds `SegmentCaption` text.
    SegmentCaption,
}

/// The TextEmbedding stage, shared by both caption kinds.
pub struct TextEmbeddingTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
    kind: CaptionKind,
}

impl TextEmbeddingTask {
    /// Build the stage over a service client bound to the
    /// text-embedding microservice.
    pub fn new(visitor: PersistenceVisitor, client: ServiceClient, config: TaskConfig, kind: CaptionKind) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
            kind,
        }
    }

    fn empty_artifact(&self, descriptor: &CaptionEmbeddingDescriptor) -> Artifact {
        match self.kind {
            CaptionKind::ImageCaption => Artifact::TextCaptionEmbedding(TextCaptionEmbeddingArtifact {
                video_id: descriptor.video.video_id.clone(),
                user_bucket: descriptor.video.user_bucket.clone(),
                parent_artifact_id: descriptor.parent_artifact_id.clone(),
                embedding: Vec::new(),
            }),
            CaptionKind::SegmentCaption => Artifact::SegmentCaptionEmbedding(SegmentCaptionEmbeddingArtifact {
                video_id: descriptor.video.video_id.clone(),
                user_bucket: descriptor.video.user_bucket.clone(),
                parent_artifact_id: descriptor.parent_artifact_id.clone(),
                embedding: Vec::new(),
            }),
        }
    }

    fn full_artifact(&self, descriptor: &CaptionEmbeddingDescriptor, embedding: Vec<f32>) -> Artifact {
        match self.kind {
            CaptionKind::ImageCaption => Artifact::TextCaptionEmbedding(TextCaptionEmbeddingArtifact {
                video_id: descriptor.video.video_id.clone(),
                user_bucket: descriptor.video.user_bucket.clone(),
                parent_artifact_id: descriptor.parent_artifact_id.clone(),
                embedding,
            }),
            CaptionKind::SegmentCaption => Artifact::SegmentCaptionEmbedding(SegmentCaptionEmbeddingArtifact {
                video_id: descriptor.video.video_id.clone(),
                user_bucket: descriptor.video.user_bucket.clone(),
                parent_artifact_id: descriptor.parent_artifact_id.clone(),
                embedding,
            }),
        }
    }
}

#[async_trait::async_trait]
impl Task for TextEmbeddingTask {
    type Input = Vec<CaptionEmbeddingInput>;
    type Descriptor = CaptionEmbeddingDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input
            .into_iter()
            .map(|item| CaptionEmbeddingDescriptor {
                video: item.video,
                parent_artifact_id: item.parent_artifact_id,
                text: item.text,
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

                let req = TextEmbedRequest {
                    texts: pending.iter().map(|d| d.text.clone()).collect(),
                    metadata: serde_json::json!({ "video_id": pending[0].video.video_id }),
                };
                let result: IngestResult<TextEmbedResponse> = ingest_registry::scoped_model(
                    &self.client,
                    &self.config.model_name,
                    || self.client.invoke("/infer", &req),
                )
                .await;
                match result {
                    Ok(resp) => {
                        for (descriptor, embedding) in pending.into_iter().zip(resp.embeddings.into_iter()) {
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
                let embedding = decode_embedding(&bytes)?;
                let artifact = self.full_artifact(&item.descriptor, embedding);
                self.visitor.persist(&artifact, Payload::Bytes(bytes)).await?;
                Ok(item.descriptor)
            }
            Outcome::Produced(_) => Ok(item.descriptor),
        }
    }
}
