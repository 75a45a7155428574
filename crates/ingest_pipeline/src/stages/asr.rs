//! ASR stage (spec §4.8.3): one ASR artifact per video, holding the
//! full timestamped transcript.

use async_stream::stream;
use ingest_artifact::{Artifact, AsrArtifact, AsrToken, Payload, PersistenceVisitor};
use ingest_error::IngestResult;
use ingest_registry::ServiceClient;

use crate::common::VideoRef;
use crate::contracts::{AsrRequest, AsrResponse};
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

const TASK_NAME: &str = "AsrTask";

/// Descriptor for one video's transcription run.
#[derive(Debug, Clone)]
pub struct AsrDescriptor {
    /// The video being transcribed.
    pub video: VideoRef,
}

/// The ASR stage.
pub struct AsrTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
}

impl AsrTask {
    /// Build the stage over a service client bound to the ASR
    /// microservice.
    pub fn new(visitor: PersistenceVisitor, client: ServiceClient, config: TaskConfig) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
        }
    }

    fn empty_artifact(&self, video: &VideoRef) -> Artifact {
        Artifact::Asr(AsrArtifact {
            video_id: video.video_id.clone(),
            user_bucket: video.user_bucket.clone(),
            task_name: TASK_NAME.to_string(),
            parent_artifact_id: video.video_artifact_id.clone(),
            tokens: Vec::new(),
        })
    }
}

#[async_trait::async_trait]
impl Task for AsrTask {
    type Input = Vec<VideoRef>;
    type Descriptor = AsrDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input.into_iter().map(|video| AsrDescriptor { video }).collect())
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for descriptor in descriptors {
                let probe = self.empty_artifact(&descriptor.video);
                match self.visitor.exists(&probe).await {
                    Ok(true) => yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped }),
                    Ok(false) => {
                        let req = AsrRequest {
                            video_minio_url: &descriptor.video.blob_url,
                            metadata: serde_json::json!({ "video_id": descriptor.video.video_id }),
                            config: None,
                        };
                        let result: IngestResult<AsrResponse> = ingest_registry::scoped_model(
                            &self.client,
                            &self.config.model_name,
                            || self.client.invoke("/infer", &req),
                        )
                        .await;
                        match result {
                            Ok(resp) => {
                                let tokens: Vec<AsrToken> = resp
                                    .result
                                    .tokens
                                    .into_iter()
                                    .map(|t| AsrToken {
                                        text: t.text,
                                        start: t.start,
                                        end: t.end,
                                        start_frame: t.start_frame,
                                        end_frame: t.end_frame,
                                    })
                                    .collect();
                                let value = serde_json::to_value(&tokens)
                                    .map(|tokens| serde_json::json!({ "tokens": tokens }));
                                match value {
                                    Ok(payload) => yield Ok(WorkItem {
                                        descriptor,
                                        outcome: Outcome::Produced(Payload::Json(payload)),
                                    }),
                                    Err(e) => yield Err(ingest_error::JsonError::new(e.to_string()).into()),
                                }
                            }
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
                let tokens: Vec<AsrToken> = match &payload {
                    Payload::Json(value) => serde_json::from_value(value["tokens"].clone())
                        .map_err(|e| ingest_error::JsonError::new(e.to_string()))?,
                    _ => Vec::new(),
                };
                let artifact = Artifact::Asr(AsrArtifact {
                    video_id: item.descriptor.video.video_id.clone(),
                    user_bucket: item.descriptor.video.user_bucket.clone(),
                    task_name: TASK_NAME.to_string(),
                    parent_artifact_id: item.descriptor.video.video_artifact_id.clone(),
                    tokens,
                });
                self.visitor.persist(&artifact, payload).await?;
                Ok(item.descriptor)
            }
        }
    }
}
