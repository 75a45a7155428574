//! Flow orchestrator (spec §4.11): wires the nine stages into the
//! ingestion DAG —
//! `Ingest -> {ShotDetect, ASR}`, `ShotDetect -> ImageExtract`,
//! `{ShotDetect, ASR} -> SegmentCaption -> SegmentCaptionEmbedding -> VectorIngest[segment]`,
//! `ImageExtract -> {ImageCaption -> TextImageCaptionEmbedding -> VectorIngest[text-caption],
//! ImageEmbedding -> VectorIngest[image]}`.
//!
//! A stage failure cancels downstream submissions for that run; every
//! artifact already persisted by an upstream stage survives, so a
//! retried run resumes from wherever `PersistenceVisitor::exists`
//! says there is nothing left to do.

use ingest_artifact::{
    AutoshotArtifact, ImageArtifact, ImageCaptionArtifact, ImageEmbeddingArtifact,
    SegmentCaptionArtifact, VideoArtifact,
};
use ingest_database::LineageTracker;
use ingest_error::{DatabaseError, DatabaseErrorKind, IngestResult, JsonError};

use crate::common::VideoRef;
use crate::task::Task;
use crate::stages::asr::AsrTask;
use crate::stages::image_caption::{ImageCaptionInput, ImageCaptionTask};
use crate::stages::image_embedding::{ImageEmbeddingInput, ImageEmbeddingTask};
use crate::stages::image_extract::{AutoshotRef, ImageExtractTask};
pub use crate::stages::ingest::VideoSubmission;
use crate::stages::ingest::IngestTask;
use crate::stages::segment_caption::{SegmentCaptionInput, SegmentCaptionTask};
use crate::stages::shot_detect::ShotDetectTask;
use crate::stages::text_embedding::{CaptionEmbeddingInput, TextEmbeddingTask};
use crate::stages::vector_ingest::{
    ImageEmbeddingIngestInput, ImageVectorIngestTask, SegmentCaptionIngestInput,
    SegmentCaptionVectorIngestTask, TextImageCaptionIngestInput, TextImageCaptionVectorIngestTask,
};

/// Every stage name a [`ProgressEvent`] can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// The Ingest stage.
    Ingest,
    /// The ShotDetect stage.
    ShotDetect,
    /// The ASR stage.
    Asr,
    /// The ImageExtract stage.
    ImageExtract,
    /// The SegmentCaption stage.
    SegmentCaption,
    /// The ImageCaption stage.
    ImageCaption,
    /// The ImageEmbedding stage.
    ImageEmbedding,
    /// The image-caption text-embedding stage.
    TextImageCaptionEmbedding,
    /// The segment-caption embedding stage.
    SegmentCaptionEmbedding,
    /// The image-embedding VectorIngest stage.
    VectorIngestImage,
    /// The image-caption VectorIngest stage.
    VectorIngestTextImageCaption,
    /// The segment-caption VectorIngest stage.
    VectorIngestSegmentCaption,
}

/// One `(video_id, stage)` completion event (spec §4.11).
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProgressEvent {
    /// The video the completed stage ran for.
    pub video_id: String,
    /// The stage that just finished.
    pub stage: StageName,
}

/// Owns every stage and drives one video through the full DAG. Each
/// stage's own sampling/batch tunables are fixed at construction
/// (`ImageExtractTask::new`'s `n_per_segment`, etc.); the orchestrator
/// only sequences stages and shuttles artifact references between
/// them.
pub struct FlowOrchestrator {
    lineage: LineageTracker,
    ingest: IngestTask,
    shot_detect: ShotDetectTask,
    asr: AsrTask,
    image_extract: ImageExtractTask,
    segment_caption: SegmentCaptionTask,
    image_caption: ImageCaptionTask,
    image_embedding: ImageEmbeddingTask,
    text_image_caption_embedding: TextEmbeddingTask,
    segment_caption_embedding: TextEmbeddingTask,
    image_vector_ingest: ImageVectorIngestTask,
    text_image_caption_vector_ingest: TextImageCaptionVectorIngestTask,
    segment_caption_vector_ingest: SegmentCaptionVectorIngestTask,
}

impl FlowOrchestrator {
    /// Assemble the orchestrator from its already-constructed stages.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lineage: LineageTracker,
        ingest: IngestTask,
        shot_detect: ShotDetectTask,
        asr: AsrTask,
        image_extract: ImageExtractTask,
        segment_caption: SegmentCaptionTask,
        image_caption: ImageCaptionTask,
        image_embedding: ImageEmbeddingTask,
        text_image_caption_embedding: TextEmbeddingTask,
        segment_caption_embedding: TextEmbeddingTask,
        image_vector_ingest: ImageVectorIngestTask,
        text_image_caption_vector_ingest: TextImageCaptionVectorIngestTask,
        segment_caption_vector_ingest: SegmentCaptionVectorIngestTask,
    ) -> Self {
        Self {
            lineage,
            ingest,
            shot_detect,
            asr,
            image_extract,
            segment_caption,
            image_caption,
            image_embedding,
            text_image_caption_embedding,
            segment_caption_embedding,
            image_vector_ingest,
            text_image_caption_vector_ingest,
            segment_caption_vector_ingest,
        }
    }

    async fn artifact_row<T: serde::de::DeserializeOwned>(&self, id: &str) -> IngestResult<T> {
        let row = self
            .lineage
            .get_artifact(id)
            .await?
            .ok_or_else(|| DatabaseError::new(DatabaseErrorKind::NotFound))?;
        serde_json::from_value(row.payload).map_err(|e| JsonError::new(e.to_string()).into())
    }

    /// Run every stage for one video, in DAG order, returning every
    /// stage-completion event in the order stages actually finished.
    pub async fn run_video(&self, submission: VideoSubmission) -> IngestResult<Vec<ProgressEvent>> {
        let video_id = submission.video_id.clone();
        let mut events = Vec::new();

        self.ingest.run(vec![submission.clone()]).await?;
        let video_artifact_id = VideoArtifact {
            video_id: submission.video_id.clone(),
            user_bucket: submission.user_bucket.clone(),
            blob_url: String::new(),
            extension: String::new(),
            fps: 0.0,
        }
        .artifact_id();
        let video: VideoArtifact = self.artifact_row(&video_artifact_id).await?;
        let video_ref = VideoRef {
            video_id: video_id.clone(),
            user_bucket: submission.user_bucket.clone(),
            blob_url: video.blob_url,
            video_artifact_id: video_artifact_id.clone(),
            fps: video.fps,
        };
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::Ingest });

        let (shot_result, asr_result) = tokio::join!(
            self.shot_detect.run(vec![video_ref.clone()]),
            self.asr.run(vec![video_ref.clone()]),
        );
        shot_result?;
        asr_result?;
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::ShotDetect });
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::Asr });

        let autoshot_artifact_id = AutoshotArtifact {
            video_id: video_id.clone(),
            user_bucket: video_ref.user_bucket.clone(),
            task_name: "ShotDetectTask".to_string(),
            parent_artifact_id: video_artifact_id.clone(),
            segments: Vec::new(),
        }
        .artifact_id();
        let autoshot_object_key = format!("autoshot/{video_id}/segments.json");

        // ASR's object key is a pure function of `video_id` (spec §3.1);
        // the artifact row itself only needs to exist in the lineage
        // store, not be re-identified here.
        let asr_object_key = format!("asr/{video_id}/transcript.json");

        let (image_extract_result, segment_caption_result) = tokio::join!(
            self.image_extract.run(vec![AutoshotRef {
                video: video_ref.clone(),
                autoshot_artifact_id: autoshot_artifact_id.clone(),
                object_key: autoshot_object_key.clone(),
            }]),
            self.segment_caption.run(vec![SegmentCaptionInput {
                video: video_ref.clone(),
                autoshot_artifact_id: autoshot_artifact_id.clone(),
                segments_object_key: autoshot_object_key.clone(),
                asr_object_key: Some(asr_object_key.clone()),
            }]),
        );
        image_extract_result?;
        segment_caption_result?;
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::ImageExtract });
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::SegmentCaption });

        let image_rows = self
            .lineage
            .get_children(&autoshot_artifact_id, Some(&["image".to_string()]))
            .await?;
        let images: Vec<ImageArtifact> = image_rows
            .into_iter()
            .map(|row| serde_json::from_value(row.payload).map_err(|e| JsonError::new(e.to_string()).into()))
            .collect::<IngestResult<Vec<_>>>()?;

        let segment_caption_rows = self
            .lineage
            .get_children(&autoshot_artifact_id, Some(&["segment_caption".to_string()]))
            .await?;
        let segment_captions: Vec<SegmentCaptionArtifact> = segment_caption_rows
            .into_iter()
            .map(|row| serde_json::from_value(row.payload).map_err(|e| JsonError::new(e.to_string()).into()))
            .collect::<IngestResult<Vec<_>>>()?;

        let image_caption_inputs: Vec<ImageCaptionInput> = images
            .iter()
            .map(|image| ImageCaptionInput {
                video: video_ref.clone(),
                image_artifact_id: image.artifact_id(),
                frame_index: image.frame_index,
                image_object_key: image.object_key(),
            })
            .collect();
        let image_embedding_inputs: Vec<ImageEmbeddingInput> = images
            .iter()
            .map(|image| ImageEmbeddingInput {
                video: video_ref.clone(),
                image_artifact_id: image.artifact_id(),
                frame_index: image.frame_index,
                timestamp: image.timestamp,
                image_object_key: image.object_key(),
            })
            .collect();

        let (image_caption_result, image_embedding_result, segment_caption_embedding_result) = tokio::join!(
            self.image_caption.run(image_caption_inputs),
            self.image_embedding.run(image_embedding_inputs),
            self.segment_caption_embedding.run(
                segment_captions
                    .iter()
                    .map(|sc| CaptionEmbeddingInput {
                        video: video_ref.clone(),
                        parent_artifact_id: sc.artifact_id(),
                        text: sc.caption.clone(),
                    })
                    .collect::<Vec<_>>()
            ),
        );
        image_caption_result?;
        image_embedding_result?;
        segment_caption_embedding_result?;
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::ImageCaption });
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::ImageEmbedding });
        events.push(ProgressEvent {
            video_id: video_id.clone(),
            stage: StageName::SegmentCaptionEmbedding,
        });

        // `ImageCaption` rows are children of each `Image` artifact, not
        // of the shared autoshot parent, so they can't be fetched with a
        // single `get_children` call the way segment captions are;
        // `list_for_video` plus a type filter gets every row in one trip.
        let image_captions: Vec<ImageCaptionArtifact> = self
            .lineage
            .list_for_video(&video_id)
            .await?
            .into_iter()
            .filter(|row| row.artifact_type == "image_caption")
            .map(|row| serde_json::from_value(row.payload).map_err(|e| JsonError::new(e.to_string()).into()))
            .collect::<IngestResult<Vec<_>>>()?;

        let text_image_caption_embedding_inputs: Vec<CaptionEmbeddingInput> = image_captions
            .iter()
            .map(|caption| CaptionEmbeddingInput {
                video: video_ref.clone(),
                parent_artifact_id: caption.artifact_id(),
                text: caption.caption.clone(),
            })
            .collect();
        self.text_image_caption_embedding
            .run(text_image_caption_embedding_inputs)
            .await?;
        events.push(ProgressEvent {
            video_id: video_id.clone(),
            stage: StageName::TextImageCaptionEmbedding,
        });

        let image_vector_inputs: Vec<ImageEmbeddingIngestInput> = images
            .iter()
            .map(|image| {
                let embedding_artifact = ImageEmbeddingArtifact {
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    parent_artifact_id: image.artifact_id(),
                    frame_index: image.frame_index,
                    timestamp: image.timestamp,
                    embedding: Vec::new(),
                };
                ImageEmbeddingIngestInput {
                    artifact_id: embedding_artifact.artifact_id(),
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    frame_index: image.frame_index,
                    timestamp: image.timestamp,
                    embedding_object_key: embedding_artifact.object_key(),
                    image_object_key: image.object_key(),
                }
            })
            .collect();

        let images_by_id: std::collections::HashMap<String, &ImageArtifact> =
            images.iter().map(|image| (image.artifact_id(), image)).collect();

        let text_image_caption_vector_inputs: Vec<TextImageCaptionIngestInput> = image_captions
            .iter()
            .filter_map(|caption| images_by_id.get(&caption.parent_artifact_id).map(|image| (caption, *image)))
            .map(|(caption, image)| {
                let text_embedding_artifact = ingest_artifact::TextCaptionEmbeddingArtifact {
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    parent_artifact_id: caption.artifact_id(),
                    embedding: Vec::new(),
                };
                TextImageCaptionIngestInput {
                    artifact_id: text_embedding_artifact.artifact_id(),
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    frame_index: image.frame_index,
                    timestamp: image.timestamp,
                    embedding_object_key: text_embedding_artifact.object_key(),
                    caption_object_key: caption.object_key(),
                    image_object_key: image.object_key(),
                }
            })
            .collect();

        let segment_caption_vector_inputs: Vec<SegmentCaptionIngestInput> = segment_captions
            .iter()
            .map(|sc| {
                let embedding_artifact = ingest_artifact::SegmentCaptionEmbeddingArtifact {
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    parent_artifact_id: sc.artifact_id(),
                    embedding: Vec::new(),
                };
                SegmentCaptionIngestInput {
                    artifact_id: embedding_artifact.artifact_id(),
                    video_id: video_id.clone(),
                    user_bucket: video_ref.user_bucket.clone(),
                    start_frame: sc.start_frame,
                    end_frame: sc.end_frame,
                    start_time: frame_time(sc.start_frame, video_ref.fps),
                    end_time: frame_time(sc.end_frame, video_ref.fps),
                    embedding_object_key: embedding_artifact.object_key(),
                    caption_object_key: sc.object_key(),
                }
            })
            .collect();

        let (image_vector_result, text_caption_vector_result, segment_vector_result) = tokio::join!(
            self.image_vector_ingest.run(image_vector_inputs),
            self.text_image_caption_vector_ingest.run(text_image_caption_vector_inputs),
            self.segment_caption_vector_ingest.run(segment_caption_vector_inputs),
        );
        image_vector_result?;
        text_caption_vector_result?;
        segment_vector_result?;
        events.push(ProgressEvent { video_id: video_id.clone(), stage: StageName::VectorIngestImage });
        events.push(ProgressEvent {
            video_id: video_id.clone(),
            stage: StageName::VectorIngestTextImageCaption,
        });
        events.push(ProgressEvent { video_id, stage: StageName::VectorIngestSegmentCaption });

        Ok(events)
    }
}

fn frame_time(frame_index: i64, fps: f64) -> f64 {
    if fps <= 0.0 {
        0.0
    } else {
        frame_index as f64 / fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_time_divides_by_fps() {
        assert!((frame_time(30, 30.0) - 1.0).abs() < 1e-9);
        assert!((frame_time(45, 30.0) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn frame_time_guards_zero_fps() {
        assert_eq!(frame_time(100, 0.0), 0.0);
    }

    #[test]
    fn stage_name_serializes_snake_case() {
        let json = serde_json::to_string(&StageName::VectorIngestTextImageCaption).unwrap();
        assert_eq!(json, "\"vector_ingest_text_image_caption\"");
    }
}
