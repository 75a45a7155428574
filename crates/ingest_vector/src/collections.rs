//! The three concrete embedding collections (spec §4.6).

use serde_json::json;

use ingest_error::IngestResult;

use crate::client::{artifact_id_filter, video_id_filter, VectorIndexClient};
use crate::point::VectorRow;

/// Collection name for image embeddings.
pub const IMAGE_EMBEDDING: &str = "image_embedding";
/// Collection name for image-caption text embeddings.
pub const TEXT_IMAGE_CAPTION_EMBEDDING: &str = "text_image_caption_embedding";
/// Collection name for segment-caption text embeddings.
pub const SEGMENT_CAPTION_EMBEDDING: &str = "segment_caption_embedding";

/// A row for the `ImageEmbedding` collection.
#[derive(Debug, Clone)]
pub struct ImageEmbeddingRow {
    /// The `ImageEmbedding` artifact's id.
    pub artifact_id: String,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
    /// The video this image belongs to.
    pub related_video_id: String,
    /// Blob store URL for the source image.
    pub minio_url: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Frame index within the video.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
}

impl From<ImageEmbeddingRow> for VectorRow {
    fn from(row: ImageEmbeddingRow) -> Self {
        let payload = json!({
            "id": row.artifact_id,
            "related_video_id": row.related_video_id,
            "minio_url": row.minio_url,
            "user_bucket": row.user_bucket,
            "frame_index": row.frame_index,
            "timestamp": row.timestamp,
        });
        VectorRow {
            artifact_id: row.artifact_id,
            embedding: row.embedding,
            payload: payload.as_object().expect("json! object").clone(),
        }
    }
}

/// A row for the `TextImageCaptionEmbedding` collection.
#[derive(Debug, Clone)]
pub struct TextImageCaptionEmbeddingRow {
    /// The `TextCaptionEmbedding` artifact's id.
    pub artifact_id: String,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
    /// Frame index the caption describes.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// The video this caption belongs to.
    pub related_video_id: String,
    /// Caption text, capped at 10k chars (spec §4.6).
    pub caption: String,
    /// Blob store URL for the caption json.
    pub caption_minio_url: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Blob store URL for the source image.
    pub image_minio_url: String,
}

impl From<TextImageCaptionEmbeddingRow> for VectorRow {
    fn from(row: TextImageCaptionEmbeddingRow) -> Self {
        let payload = json!({
            "id": row.artifact_id,
            "frame_index": row.frame_index,
            "timestamp": row.timestamp,
            "related_video_id": row.related_video_id,
            "caption": row.caption,
            "caption_minio_url": row.caption_minio_url,
            "user_bucket": row.user_bucket,
            "image_minio_url": row.image_minio_url,
        });
        VectorRow {
            artifact_id: row.artifact_id,
            embedding: row.embedding,
            payload: payload.as_object().expect("json! object").clone(),
        }
    }
}

/// A row for the `SegmentCaptionEmbedding` collection.
#[derive(Debug, Clone)]
pub struct SegmentCaptionEmbeddingRow {
    /// The `SegmentCaptionEmbedding` artifact's id.
    pub artifact_id: String,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
    /// First frame of the segment.
    pub start_frame: i64,
    /// Last frame of the segment.
    pub end_frame: i64,
    /// Segment start time in seconds.
    pub start_time: f64,
    /// Segment end time in seconds.
    pub end_time: f64,
    /// The video this segment belongs to.
    pub related_video_id: String,
    /// Caption text, capped at 10k chars (spec §4.6).
    pub caption: String,
    /// Blob store URL for the segment caption json.
    pub segment_caption_minio_url: String,
    /// Tenant bucket.
    pub user_bucket: String,
}

impl From<SegmentCaptionEmbeddingRow> for VectorRow {
    fn from(row: SegmentCaptionEmbeddingRow) -> Self {
        let payload = json!({
            "id": row.artifact_id,
            "start_frame": row.start_frame,
            "end_frame": row.end_frame,
            "start_time": row.start_time,
            "end_time": row.end_time,
            "related_video_id": row.related_video_id,
            "caption": row.caption,
            "segment_caption_minio_url": row.segment_caption_minio_url,
            "user_bucket": row.user_bucket,
        });
        VectorRow {
            artifact_id: row.artifact_id,
            embedding: row.embedding,
            payload: payload.as_object().expect("json! object").clone(),
        }
    }
}

/// Delete every row across all three collections for `video_id`
/// (spec §4.9: cascading delete touches every vector collection).
pub async fn delete_video_from_all_collections(
    client: &VectorIndexClient,
    video_id: &str,
) -> IngestResult<()> {
    for collection in [IMAGE_EMBEDDING, TEXT_IMAGE_CAPTION_EMBEDDING, SEGMENT_CAPTION_EMBEDDING] {
        client.ensure_loaded(collection).await?;
        client
            .delete_by_filter(collection, video_id_filter(video_id))
            .await?;
    }
    Ok(())
}

/// Delete the rows in `collection` whose `id` matches one of
/// `artifact_ids` (spec §4.9's stage-scoped delete). One request per
/// id: the collections hold at most a few thousand rows per video, so
/// this stays well inside the fan-out the rest of the system already
/// does per-item.
pub async fn delete_artifacts_from_collection(
    client: &VectorIndexClient,
    collection: &str,
    artifact_ids: &[String],
) -> IngestResult<()> {
    for artifact_id in artifact_ids {
        client.delete_by_filter(collection, artifact_id_filter(artifact_id)).await?;
    }
    Ok(())
}

/// Per-collection row counts for `video_id` (spec §4.10).
pub async fn count_for_video(
    client: &VectorIndexClient,
    video_id: &str,
) -> IngestResult<VideoVectorCounts> {
    Ok(VideoVectorCounts {
        image_embedding: client.count(IMAGE_EMBEDDING, video_id_filter(video_id)).await?,
        text_image_caption_embedding: client
            .count(TEXT_IMAGE_CAPTION_EMBEDDING, video_id_filter(video_id))
            .await?,
        segment_caption_embedding: client
            .count(SEGMENT_CAPTION_EMBEDDING, video_id_filter(video_id))
            .await?,
    })
}

/// Per-collection vector row counts for one video.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct VideoVectorCounts {
    /// Rows in `image_embedding`.
    pub image_embedding: u64,
    /// Rows in `text_image_caption_embedding`.
    pub text_image_caption_embedding: u64,
    /// Rows in `segment_caption_embedding`.
    pub segment_caption_embedding: u64,
}
