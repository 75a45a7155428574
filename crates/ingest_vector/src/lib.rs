//! Vector index client for the three embedding collections (spec
//! §4.5, §4.6): collection lifecycle, batched insert, dedup lookups,
//! and filtered delete, backed by Qdrant.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod collections;
mod point;

pub use client::{artifact_id_filter, video_id_filter, VectorIndexClient};
pub use collections::{
    count_for_video, delete_artifacts_from_collection, delete_video_from_all_collections,
    ImageEmbeddingRow, SegmentCaptionEmbeddingRow, TextImageCaptionEmbeddingRow,
    VideoVectorCounts, IMAGE_EMBEDDING, SEGMENT_CAPTION_EMBEDDING, TEXT_IMAGE_CAPTION_EMBEDDING,
};
pub use point::{point_id_for, VectorRow};
