//! Status reporter (spec §4.10): summarize how far a video has moved
//! through the pipeline without touching the pipeline stages
//! themselves — everything here is read-only lineage/vector queries.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ingest_database::LineageTracker;
use ingest_error::IngestResult;
use ingest_vector::{count_for_video, VectorIndexClient, VideoVectorCounts};

/// Every artifact type a complete run can produce, in pipeline order.
/// The denominator for `progress_percentage` (spec §4.10).
pub const ALL_STAGES: &[&str] = &[
    "video",
    "autoshot",
    "asr",
    "image",
    "segment_caption",
    "image_caption",
    "image_embedding",
    "text_caption_embedding",
    "segment_caption_embedding",
];

/// Point-in-time summary of one video's progress (spec §6.2's
/// `GET /management/videos/{video_id}/status`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct VideoStatus {
    /// The video's external id.
    pub video_id: String,
    /// Human-facing name; no separate name is tracked anywhere in the
    /// lineage store, so this is the video id itself.
    pub video_name: String,
    /// Artifact-type tags with at least one row for this video.
    pub stages_completed: Vec<String>,
    /// `stages_completed.len() / ALL_STAGES.len() * 100`.
    pub progress_percentage: f64,
    /// Supplementary counts and locators.
    pub metadata: VideoStatusMetadata,
}

/// The `metadata` object inside [`VideoStatus`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct VideoStatusMetadata {
    /// Row count per artifact type.
    pub artifact_counts: HashMap<String, usize>,
    /// The source video's blob URL, if the `Video` artifact was found.
    pub minio_url: Option<String>,
    /// Per-collection vector row counts.
    pub milvus_info: VideoVectorCounts,
    /// Latest `created_at` among every descendant artifact.
    pub latest_created_at: Option<DateTime<Utc>>,
}

/// Reads lineage and vector state to answer "how far along is this
/// video".
pub struct StatusReporter {
    lineage: LineageTracker,
    vector: Arc<VectorIndexClient>,
}

impl StatusReporter {
    /// Build the reporter over the shared backends.
    pub fn new(lineage: LineageTracker, vector: Arc<VectorIndexClient>) -> Self {
        Self { lineage, vector }
    }

    /// Report `video_id`'s status, or `None` if nothing has been
    /// persisted for it yet.
    #[tracing::instrument(skip(self))]
    pub async fn get_status(&self, video_id: &str) -> IngestResult<Option<VideoStatus>> {
        let rows = self.lineage.list_for_video(video_id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let stages_present: HashSet<&str> =
            rows.iter().map(|r| r.artifact_type.as_str()).collect();
        let stages_completed: Vec<String> = ALL_STAGES
            .iter()
            .filter(|s| stages_present.contains(*s))
            .map(|s| s.to_string())
            .collect();
        let progress_percentage =
            stages_completed.len() as f64 / ALL_STAGES.len() as f64 * 100.0;

        let mut artifact_counts: HashMap<String, usize> = HashMap::new();
        for row in &rows {
            *artifact_counts.entry(row.artifact_type.clone()).or_insert(0) += 1;
        }

        let minio_url = rows
            .iter()
            .find(|r| r.artifact_type == "video")
            .and_then(|r| r.payload.get("blob_url"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let latest_created_at = rows.iter().map(|r| r.created_at).max();
        let milvus_info = count_for_video(&self.vector, video_id).await?;

        Ok(Some(VideoStatus {
            video_id: video_id.to_string(),
            video_name: video_id.to_string(),
            stages_completed,
            progress_percentage,
            metadata: VideoStatusMetadata {
                artifact_counts,
                minio_url,
                milvus_info,
                latest_created_at,
            },
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_stages_has_nine_entries() {
        assert_eq!(ALL_STAGES.len(), 9);
    }
}
