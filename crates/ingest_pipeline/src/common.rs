//! Shared descriptor fragments every downstream stage needs to locate
//! the video it's working from.

/// The subset of a `Video` artifact's fields every stage that reads
/// from the source video needs, carried forward from the Ingest stage
/// output so later stages never re-fetch the lineage row for it.
#[derive(Debug, Clone)]
pub struct VideoRef {
    /// The video's external identifier.
    pub video_id: String,
    /// Tenant bucket.
    pub user_bucket: String,
    /// External location of the source video.
    pub blob_url: String,
    /// Content-addressed id of the `Video` artifact.
    pub video_artifact_id: String,
    /// Frames per second, probed by the Ingest stage.
    pub fps: f64,
}
