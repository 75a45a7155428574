//! ShotDetect stage (spec §4.8.2): one Autoshot artifact per video,
//! holding every shot boundary the service returns.

use async_stream::stream;
use ingest_artifact::{Artifact, AutoshotArtifact, Payload, PersistenceVisitor};
use ingest_error::IngestResult;
use ingest_registry::ServiceClient;

use crate::common::VideoRef;
use crate::contracts::{ShotDetectRequest, ShotDetectResponse};
use crate::task::{Outcome, Task, TaskConfig, WorkItem, WorkStream};

const TASK_NAME: &str = "ShotDetectTask";

/// Descriptor for one video's shot-detection run.
#[derive(Debug, Clone)]
pub struct ShotDetectDescriptor {
    /// The video being segmented.
    pub video: VideoRef,
}

/// The ShotDetect stage.
pub struct ShotDetectTask {
    visitor: PersistenceVisitor,
    client: ServiceClient,
    config: TaskConfig,
}

impl ShotDetectTask {
    /// Build the stage over a service client bound to the shot-boundary
    /// microservice.
    pub fn new(visitor: PersistenceVisitor, client: ServiceClient, config: TaskConfig) -> Self {
        Self {
            visitor,
            client: client.with_overrides(config.client_overrides()),
            config,
        }
    }

    fn empty_artifact(&self, video: &VideoRef) -> Artifact {
        Artifact::Autoshot(AutoshotArtifact {
            video_id: video.video_id.clone(),
            user_bucket: video.user_bucket.clone(),
            task_name: TASK_NAME.to_string(),
            parent_artifact_id: video.video_artifact_id.clone(),
            segments: Vec::new(),
        })
    }
}

#[async_trait::async_trait]
impl Task for ShotDetectTask {
    type Input = Vec<VideoRef>;
    type Descriptor = ShotDetectDescriptor;

    async fn preprocess(&self, input: Self::Input) -> IngestResult<Vec<Self::Descriptor>> {
        Ok(input.into_iter().map(|video| ShotDetectDescriptor { video }).collect())
    }

    fn execute<'a>(&'a self, descriptors: Vec<Self::Descriptor>) -> WorkStream<'a, Self::Descriptor> {
        Box::pin(stream! {
            for descriptor in descriptors {
                let probe = self.empty_artifact(&descriptor.video);
                match self.visitor.exists(&probe).await {
                    Ok(true) => yield Ok(WorkItem { descriptor, outcome: Outcome::Skipped }),
                    Ok(false) => {
                        let req = ShotDetectRequest {
                            s3_minio_url: &descriptor.video.blob_url,
                            metadata: serde_json::json!({ "video_id": descriptor.video.video_id }),
                        };
                        let result: IngestResult<ShotDetectResponse> = ingest_registry::scoped_model(
                            &self.client,
                            &self.config.model_name,
                            || self.client.invoke("/infer", &req),
                        )
                        .await;
                        match result {
                            Ok(resp) => {
                                let payload = serde_json::json!({ "segments": resp.scenes });
                                yield Ok(WorkItem {
                                    descriptor,
                                    outcome: Outcome::Produced(Payload::Json(payload)),
                                });
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
                let segments = match &payload {
                    Payload::Json(value) => serde_json::from_value(value["segments"].clone())
                        .map_err(|e| ingest_error::JsonError::new(e.to_string()))?,
                    _ => Vec::new(),
                };
                let artifact = Artifact::Autoshot(AutoshotArtifact {
                    video_id: item.descriptor.video.video_id.clone(),
                    user_bucket: item.descriptor.video.user_bucket.clone(),
                    task_name: TASK_NAME.to_string(),
                    parent_artifact_id: item.descriptor.video.video_artifact_id.clone(),
                    segments,
                });
                self.visitor.persist(&artifact, payload).await?;
                Ok(item.descriptor)
            }
        }
    }
}
