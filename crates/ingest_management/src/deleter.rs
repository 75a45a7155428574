//! Cascading deleter (spec §4.9): remove a video, or one of its stage
//! subtrees, from every store. Tolerant of partial prior deletes so a
//! retried call converges rather than erroring on what is already gone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ingest_artifact::Artifact;
use ingest_database::{ArtifactRow, LineageTracker};
use ingest_error::{IngestResult, JsonError};
use ingest_storage::BlobStore;
use ingest_vector::{
    delete_artifacts_from_collection, delete_video_from_all_collections, VectorIndexClient,
    IMAGE_EMBEDDING, SEGMENT_CAPTION_EMBEDDING, TEXT_IMAGE_CAPTION_EMBEDDING,
};

/// Outcome of a delete call, shaped for the management HTTP response
/// (spec §6.2: `{deleted_artifacts, deleted_lineage, deleted_minio_objects, milvus_delete, errors}`).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DeleteReport {
    /// Ids of every artifact row removed.
    pub deleted_artifacts: Vec<String>,
    /// Count of lineage rows removed (equal to `deleted_artifacts.len()`,
    /// reported separately since the edge table is also pruned by the
    /// database's own foreign-key cascade).
    pub deleted_lineage: usize,
    /// Blob keys removed (or already absent) from the blob store.
    pub deleted_minio_objects: Vec<String>,
    /// Whether the vector-store cleanup step ran without error.
    pub milvus_delete: bool,
    /// Per-object errors encountered; a non-empty list means the
    /// deletion was partial and safe to retry.
    pub errors: Vec<String>,
}

/// Returns the collection a given artifact type's rows live in, if any.
fn collection_for(artifact_type: &str) -> Option<&'static str> {
    match artifact_type {
        "image_embedding" => Some(IMAGE_EMBEDDING),
        "text_caption_embedding" => Some(TEXT_IMAGE_CAPTION_EMBEDDING),
        "segment_caption_embedding" => Some(SEGMENT_CAPTION_EMBEDDING),
        _ => None,
    }
}

fn decode(row: &ArtifactRow) -> IngestResult<Artifact> {
    serde_json::from_value(row.payload.clone()).map_err(|e| JsonError::new(e.to_string()).into())
}

/// Cascading deleter over the three stores a full pipeline run writes
/// to.
pub struct CascadeDeleter {
    lineage: LineageTracker,
    blob_store: Arc<dyn BlobStore>,
    bucket: String,
    vector: Arc<VectorIndexClient>,
}

impl CascadeDeleter {
    /// Build the deleter over the shared backends.
    pub fn new(
        lineage: LineageTracker,
        blob_store: Arc<dyn BlobStore>,
        bucket: impl Into<String>,
        vector: Arc<VectorIndexClient>,
    ) -> Self {
        Self { lineage, blob_store, bucket: bucket.into(), vector }
    }

    async fn delete_blobs(&self, rows: &[ArtifactRow], report: &mut DeleteReport) {
        for row in rows {
            let artifact = match decode(row) {
                Ok(a) => a,
                Err(e) => {
                    report.errors.push(format!("decode {}: {e}", row.id));
                    continue;
                }
            };
            if matches!(artifact, Artifact::Video(_)) {
                // The source file lives outside our bucket; nothing to delete.
                continue;
            }
            let key = artifact.object_key();
            match self.blob_store.delete_object(&self.bucket, &key).await {
                Ok(()) => report.deleted_minio_objects.push(key),
                Err(e) => report.errors.push(format!("delete blob {key}: {e}")),
            }
        }
    }

    /// Delete every artifact traced back to `video_id`: blobs, lineage
    /// rows, and vector rows in every collection (spec §4.9, whole-video
    /// variant).
    #[tracing::instrument(skip(self))]
    pub async fn delete_video_cascade(&self, video_id: &str) -> IngestResult<Option<DeleteReport>> {
        let rows = self.lineage.list_for_video(video_id).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut report = DeleteReport::default();
        self.delete_blobs(&rows, &mut report).await;

        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        match self.lineage.delete_subtree(&ids).await {
            Ok(deleted) => {
                report.deleted_lineage = deleted.len();
                report.deleted_artifacts = deleted;
            }
            Err(e) => report.errors.push(format!("delete lineage: {e}")),
        }

        match delete_video_from_all_collections(&self.vector, video_id).await {
            Ok(()) => report.milvus_delete = true,
            Err(e) => {
                report.milvus_delete = false;
                report.errors.push(format!("delete vector rows: {e}"));
            }
        }

        Ok(Some(report))
    }

    /// Delete the subtree rooted at every artifact of `artifact_type`
    /// within `video_id` (spec §4.9, stage-scoped variant): expands each
    /// matching artifact to its own descendants before deleting, so
    /// deleting `"autoshot"` also removes every image/caption/embedding
    /// that traces back to it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_stage_artifacts(
        &self,
        video_id: &str,
        artifact_type: &str,
    ) -> IngestResult<Option<DeleteReport>> {
        let video_rows = self.lineage.list_for_video(video_id).await?;
        if video_rows.is_empty() {
            return Ok(None);
        }
        let by_id: HashMap<&str, &ArtifactRow> =
            video_rows.iter().map(|r| (r.id.as_str(), r)).collect();

        let roots: Vec<String> = video_rows
            .iter()
            .filter(|r| r.artifact_type == artifact_type)
            .map(|r| r.id.clone())
            .collect();

        let mut report = DeleteReport::default();
        if roots.is_empty() {
            // Video exists, but nothing of this stage does; an empty,
            // error-free report rather than a 404.
            report.milvus_delete = true;
            return Ok(Some(report));
        }

        let mut expanded: HashSet<String> = roots.iter().cloned().collect();
        for root in &roots {
            match self.lineage.get_descendants(root).await {
                Ok(descendants) => expanded.extend(descendants.into_iter().map(|d| d.id)),
                Err(e) => report.errors.push(format!("walk descendants of {root}: {e}")),
            }
        }

        let expanded_rows: Vec<ArtifactRow> = expanded
            .iter()
            .filter_map(|id| by_id.get(id.as_str()).map(|r| (*r).clone()))
            .collect();
        self.delete_blobs(&expanded_rows, &mut report).await;

        let mut by_collection: HashMap<&'static str, Vec<String>> = HashMap::new();
        for row in &expanded_rows {
            if let Some(collection) = collection_for(&row.artifact_type) {
                by_collection.entry(collection).or_default().push(row.id.clone());
            }
        }
        report.milvus_delete = true;
        for (collection, ids) in by_collection {
            if let Err(e) = delete_artifacts_from_collection(&self.vector, collection, &ids).await {
                report.milvus_delete = false;
                report.errors.push(format!("delete vector rows in {collection}: {e}"));
            }
        }

        let root_ids: Vec<String> = roots;
        match self.lineage.delete_subtree(&root_ids).await {
            Ok(deleted) => {
                report.deleted_lineage = deleted.len();
                report.deleted_artifacts = deleted;
            }
            Err(e) => report.errors.push(format!("delete lineage: {e}")),
        }

        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_for_maps_embedding_types() {
        assert_eq!(collection_for("image_embedding"), Some(IMAGE_EMBEDDING));
        assert_eq!(collection_for("text_caption_embedding"), Some(TEXT_IMAGE_CAPTION_EMBEDDING));
        assert_eq!(collection_for("segment_caption_embedding"), Some(SEGMENT_CAPTION_EMBEDDING));
        assert_eq!(collection_for("image"), None);
        assert_eq!(collection_for("video"), None);
    }
}
