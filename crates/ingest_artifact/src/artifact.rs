//! The artifact family (spec §3.1): nine immutable, content-addressed
//! record types, one per pipeline stage's output.

use ingest_core::content_address;
use serde::{Deserialize, Serialize};

/// A `Video` artifact: the root of every lineage tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// Tenant/video identifiers.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Externally supplied source location.
    pub blob_url: String,
    /// File extension probed from the source blob.
    pub extension: String,
    /// Frames per second probed from the source blob.
    pub fps: f64,
}

impl VideoArtifact {
    /// Content-addressed id: idempotent on `video_id` (spec §4.8.1).
    pub fn artifact_id(&self) -> String {
        content_address(&["video", &self.video_id, &self.user_bucket])
    }

    /// `<type>/<video_id>/<coordinate>.<ext>` blob key.
    pub fn object_key(&self) -> String {
        format!("video/{}/source.{}", self.video_id, self.extension)
    }
}

/// An `Autoshot` artifact: one per video, holding every shot boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoshotArtifact {
    /// The video this autoshot belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Producing task's name.
    pub task_name: String,
    /// Parent `Video` artifact id.
    pub parent_artifact_id: String,
    /// Ordered `(start_frame, end_frame)` shot boundaries.
    pub segments: Vec<(i64, i64)>,
}

impl AutoshotArtifact {
    /// Content-addressed id; includes `user_bucket` (DESIGN.md
    /// correction #5) so two tenants never collide on the same id.
    pub fn artifact_id(&self) -> String {
        content_address(&[
            "autoshot",
            &self.video_id,
            &self.user_bucket,
            &self.task_name,
        ])
    }

    /// Object key for the collective segments json.
    pub fn object_key(&self) -> String {
        format!("autoshot/{}/segments.json", self.video_id)
    }
}

/// An `ASR` artifact: one per video, holding the full transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrArtifact {
    /// The video this transcript belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Producing task's name.
    pub task_name: String,
    /// Parent `Video` artifact id.
    pub parent_artifact_id: String,
    /// Timestamped tokens.
    pub tokens: Vec<AsrToken>,
}

/// One ASR token: text plus its temporal span (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrToken {
    /// The transcribed text.
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Start frame index.
    pub start_frame: i64,
    /// End frame index.
    pub end_frame: i64,
}

impl AsrArtifact {
    /// Content-addressed id.
    pub fn artifact_id(&self) -> String {
        content_address(&["asr", &self.video_id, &self.user_bucket, &self.task_name])
    }

    /// Object key for the transcript json.
    pub fn object_key(&self) -> String {
        format!("asr/{}/transcript.json", self.video_id)
    }
}

/// An `Image` artifact: one extracted keyframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// The video this frame was extracted from.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `Autoshot` artifact id.
    pub segment_parent_id: String,
    /// Index of the frame within the video.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// SHA-256 checksum of the encoded frame bytes.
    pub checksum: String,
}

impl ImageArtifact {
    /// Content-addressed id per spec §4.8.4's dedup key.
    pub fn artifact_id(&self) -> String {
        content_address(&[
            "image",
            &self.video_id,
            &self.frame_index.to_string(),
            "image/webp",
            &self.checksum,
            &self.user_bucket,
        ])
    }

    /// Object key: `images/<vid>/<frame_index>.webp`.
    pub fn object_key(&self) -> String {
        format!("images/{}/{:08}.webp", self.video_id, self.frame_index)
    }
}

/// A `SegmentCaption` artifact: an LLM-generated caption for a shot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentCaptionArtifact {
    /// The video this caption belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `Autoshot` artifact id.
    pub parent_artifact_id: String,
    /// First frame of the segment.
    pub start_frame: i64,
    /// Last frame of the segment.
    pub end_frame: i64,
    /// Caption text.
    pub caption: String,
    /// Related ASR text concatenated per spec §4.8.5's overlap rule.
    pub related_asr_text: String,
}

impl SegmentCaptionArtifact {
    /// Content-addressed id.
    pub fn artifact_id(&self) -> String {
        content_address(&[
            "segment_caption",
            &self.video_id,
            &self.start_frame.to_string(),
            &self.end_frame.to_string(),
            &self.user_bucket,
        ])
    }

    /// Object key: `caption/segment/<vid>/<sf>_<ef>.json`.
    pub fn object_key(&self) -> String {
        format!(
            "caption/segment/{}/{}_{}.json",
            self.video_id, self.start_frame, self.end_frame
        )
    }
}

/// An `ImageCaption` artifact: an LLM-generated caption for a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageCaptionArtifact {
    /// The video this caption belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `Image` artifact id.
    pub parent_artifact_id: String,
    /// Index of the captioned frame.
    pub frame_index: i64,
    /// Caption text.
    pub caption: String,
}

impl ImageCaptionArtifact {
    /// Content-addressed id, derived from the parent `Image`.
    pub fn artifact_id(&self) -> String {
        content_address(&["image_caption", &self.parent_artifact_id, &self.user_bucket])
    }

    /// Object key: `caption/image/<vid>/<frame_index>.json`.
    pub fn object_key(&self) -> String {
        format!("caption/image/{}/{:08}.json", self.video_id, self.frame_index)
    }
}

/// An `ImageEmbedding` artifact: a dense vector for a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEmbeddingArtifact {
    /// The video this embedding belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `Image` artifact id.
    pub parent_artifact_id: String,
    /// Index of the embedded frame.
    pub frame_index: i64,
    /// Frame timestamp in seconds.
    pub timestamp: f64,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
}

impl ImageEmbeddingArtifact {
    /// Content-addressed id, derived from the parent `Image`.
    pub fn artifact_id(&self) -> String {
        content_address(&["image_embedding", &self.parent_artifact_id, &self.user_bucket])
    }

    /// Object key: `embedding/image/<vid>/<frame_index>.npy`.
    pub fn object_key(&self) -> String {
        format!("embedding/image/{}/{:08}.npy", self.video_id, self.frame_index)
    }
}

/// A `TextCaptionEmbedding` artifact: a dense vector for an image caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextCaptionEmbeddingArtifact {
    /// The video this embedding belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `ImageCaption` artifact id.
    pub parent_artifact_id: String,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
}

impl TextCaptionEmbeddingArtifact {
    /// Content-addressed id, derived from the parent `ImageCaption`.
    pub fn artifact_id(&self) -> String {
        content_address(&[
            "text_caption_embedding",
            &self.parent_artifact_id,
            &self.user_bucket,
        ])
    }

    /// Object key: `embedding/text_caption/<vid>/<id>.npy`.
    pub fn object_key(&self) -> String {
        format!(
            "embedding/text_caption/{}/{}.npy",
            self.video_id, self.parent_artifact_id
        )
    }
}

/// A `SegmentCaptionEmbedding` artifact: a dense vector for a segment caption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentCaptionEmbeddingArtifact {
    /// The video this embedding belongs to.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// Parent `SegmentCaption` artifact id.
    pub parent_artifact_id: String,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
}

impl SegmentCaptionEmbeddingArtifact {
    /// Content-addressed id, derived from the parent `SegmentCaption`.
    pub fn artifact_id(&self) -> String {
        content_address(&[
            "segment_caption_embedding",
            &self.parent_artifact_id,
            &self.user_bucket,
        ])
    }

    /// Object key: `embedding/segment_caption/<vid>/<id>.npy`.
    pub fn object_key(&self) -> String {
        format!(
            "embedding/segment_caption/{}/{}.npy",
            self.video_id, self.parent_artifact_id
        )
    }
}

/// Any of the nine artifact variants, tagged by `artifact_type` for
/// lineage-row serialization.
#[derive(Debug, Clone, Serialize, Deserialize, strum::Display)]
#[serde(tag = "artifact_type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Artifact {
    /// See [`VideoArtifact`].
    Video(VideoArtifact),
    /// See [`AutoshotArtifact`].
    Autoshot(AutoshotArtifact),
    /// See [`AsrArtifact`].
    Asr(AsrArtifact),
    /// See [`ImageArtifact`].
    Image(ImageArtifact),
    /// See [`SegmentCaptionArtifact`].
    SegmentCaption(SegmentCaptionArtifact),
    /// See [`ImageCaptionArtifact`].
    ImageCaption(ImageCaptionArtifact),
    /// See [`ImageEmbeddingArtifact`].
    ImageEmbedding(ImageEmbeddingArtifact),
    /// See [`TextCaptionEmbeddingArtifact`].
    TextCaptionEmbedding(TextCaptionEmbeddingArtifact),
    /// See [`SegmentCaptionEmbeddingArtifact`].
    SegmentCaptionEmbedding(SegmentCaptionEmbeddingArtifact),
}

impl Artifact {
    /// Content-addressed id of the wrapped variant.
    pub fn artifact_id(&self) -> String {
        match self {
            Artifact::Video(a) => a.artifact_id(),
            Artifact::Autoshot(a) => a.artifact_id(),
            Artifact::Asr(a) => a.artifact_id(),
            Artifact::Image(a) => a.artifact_id(),
            Artifact::SegmentCaption(a) => a.artifact_id(),
            Artifact::ImageCaption(a) => a.artifact_id(),
            Artifact::ImageEmbedding(a) => a.artifact_id(),
            Artifact::TextCaptionEmbedding(a) => a.artifact_id(),
            Artifact::SegmentCaptionEmbedding(a) => a.artifact_id(),
        }
    }

    /// The blob store key the artifact's payload is written under.
    pub fn object_key(&self) -> String {
        match self {
            Artifact::Video(a) => a.object_key(),
            Artifact::Autoshot(a) => a.object_key(),
            Artifact::Asr(a) => a.object_key(),
            Artifact::Image(a) => a.object_key(),
            Artifact::SegmentCaption(a) => a.object_key(),
            Artifact::ImageCaption(a) => a.object_key(),
            Artifact::ImageEmbedding(a) => a.object_key(),
            Artifact::TextCaptionEmbedding(a) => a.object_key(),
            Artifact::SegmentCaptionEmbedding(a) => a.object_key(),
        }
    }

    /// The video this artifact traces back to.
    pub fn video_id(&self) -> &str {
        match self {
            Artifact::Video(a) => &a.video_id,
            Artifact::Autoshot(a) => &a.video_id,
            Artifact::Asr(a) => &a.video_id,
            Artifact::Image(a) => &a.video_id,
            Artifact::SegmentCaption(a) => &a.video_id,
            Artifact::ImageCaption(a) => &a.video_id,
            Artifact::ImageEmbedding(a) => &a.video_id,
            Artifact::TextCaptionEmbedding(a) => &a.video_id,
            Artifact::SegmentCaptionEmbedding(a) => &a.video_id,
        }
    }

    /// Tenant bucket.
    pub fn user_bucket(&self) -> &str {
        match self {
            Artifact::Video(a) => &a.user_bucket,
            Artifact::Autoshot(a) => &a.user_bucket,
            Artifact::Asr(a) => &a.user_bucket,
            Artifact::Image(a) => &a.user_bucket,
            Artifact::SegmentCaption(a) => &a.user_bucket,
            Artifact::ImageCaption(a) => &a.user_bucket,
            Artifact::ImageEmbedding(a) => &a.user_bucket,
            Artifact::TextCaptionEmbedding(a) => &a.user_bucket,
            Artifact::SegmentCaptionEmbedding(a) => &a.user_bucket,
        }
    }

    /// Direct producer input, if any (`Video` has none).
    pub fn parent_artifact_id(&self) -> Option<&str> {
        match self {
            Artifact::Video(_) => None,
            Artifact::Autoshot(a) => Some(&a.parent_artifact_id),
            Artifact::Asr(a) => Some(&a.parent_artifact_id),
            Artifact::Image(a) => Some(&a.segment_parent_id),
            Artifact::SegmentCaption(a) => Some(&a.parent_artifact_id),
            Artifact::ImageCaption(a) => Some(&a.parent_artifact_id),
            Artifact::ImageEmbedding(a) => Some(&a.parent_artifact_id),
            Artifact::TextCaptionEmbedding(a) => Some(&a.parent_artifact_id),
            Artifact::SegmentCaptionEmbedding(a) => Some(&a.parent_artifact_id),
        }
    }

    /// MIME type to upload the payload with.
    pub fn content_type(&self) -> &'static str {
        match self {
            Artifact::Image(_) => "image/webp",
            Artifact::ImageEmbedding(_)
            | Artifact::TextCaptionEmbedding(_)
            | Artifact::SegmentCaptionEmbedding(_) => "application/octet-stream",
            _ => "application/json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image(frame_index: i64, checksum: &str) -> ImageArtifact {
        ImageArtifact {
            video_id: "vid-1".into(),
            user_bucket: "tenant-a".into(),
            segment_parent_id: "autoshot-id".into(),
            frame_index,
            timestamp: 1.5,
            checksum: checksum.into(),
        }
    }

    #[test]
    fn image_id_is_stable_for_identical_inputs() {
        let a = sample_image(12, "abc");
        let b = sample_image(12, "abc");
        assert_eq!(a.artifact_id(), b.artifact_id());
    }

    #[test]
    fn image_id_changes_with_checksum() {
        let a = sample_image(12, "abc");
        let b = sample_image(12, "def");
        assert_ne!(a.artifact_id(), b.artifact_id());
    }

    #[test]
    fn image_object_key_is_zero_padded() {
        let image = sample_image(7, "abc");
        assert_eq!(image.object_key(), "images/vid-1/00000007.webp");
    }

    #[test]
    fn autoshot_id_varies_with_user_bucket() {
        let a = AutoshotArtifact {
            video_id: "vid-1".into(),
            user_bucket: "tenant-a".into(),
            task_name: "autoshot".into(),
            parent_artifact_id: "video-id".into(),
            segments: vec![(0, 10)],
        };
        let mut b = a.clone();
        b.user_bucket = "tenant-b".into();
        assert_ne!(a.artifact_id(), b.artifact_id());
    }

    #[test]
    fn video_has_no_parent() {
        let artifact = Artifact::Video(VideoArtifact {
            video_id: "vid-1".into(),
            user_bucket: "tenant-a".into(),
            blob_url: "s3://bucket/vid-1.mp4".into(),
            extension: "mp4".into(),
            fps: 30.0,
        });
        assert!(artifact.parent_artifact_id().is_none());
    }

    #[test]
    fn artifact_type_tag_is_snake_case() {
        let artifact = Artifact::ImageEmbedding(ImageEmbeddingArtifact {
            video_id: "vid-1".into(),
            user_bucket: "tenant-a".into(),
            parent_artifact_id: "image-id".into(),
            frame_index: 3,
            timestamp: 0.3,
            embedding: vec![0.1, 0.2],
        });
        assert_eq!(artifact.to_string(), "image_embedding");
    }
}
