//! Cross-store persistence visitor (spec §4.1): a single entry point
//! pipeline stages call to check idempotency and to commit their
//! output, so no stage task ever talks to [`BlobStore`] or
//! [`LineageTracker`] directly.

use ingest_database::LineageTracker;
use ingest_error::{ArtifactError, ArtifactErrorKind, IngestResult};
use ingest_storage::BlobStore;
use ingest_vector::VectorIndexClient;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::artifact::Artifact;

/// The payload to persist alongside an artifact's lineage row, if any.
/// `Video`/`Autoshot`/`Asr`/`SegmentCaption`/`ImageCaption` artifacts
/// carry their payload as a JSON blob; `Image` carries raw encoded
/// bytes; embeddings carry a serialized vector with no separate blob
/// upload at all (their payload lives only in the vector index).
pub enum Payload {
    /// A JSON document, uploaded as `application/json`.
    Json(JsonValue),
    /// Raw bytes, uploaded with the artifact's own `content_type()`.
    Bytes(Vec<u8>),
    /// No blob: the artifact's data lives only in the lineage row
    /// and/or the vector index.
    None,
}

/// Mediates `exists`/`persist` across the blob store, lineage tracker,
/// and (for embedding artifacts) the vector index.
#[derive(Clone)]
pub struct PersistenceVisitor {
    blob_store: Arc<dyn BlobStore>,
    lineage: LineageTracker,
    bucket: String,
}

impl PersistenceVisitor {
    /// Build a visitor over the given backends. `bucket` is the blob
    /// store bucket every artifact's object key is written under.
    pub fn new(blob_store: Arc<dyn BlobStore>, lineage: LineageTracker, bucket: impl Into<String>) -> Self {
        Self {
            blob_store,
            lineage,
            bucket: bucket.into(),
        }
    }

    /// True iff the artifact is already fully persisted: its lineage
    /// row exists, and — when it carries a blob — the blob is present
    /// at its object key (spec §4.1: "exists" must not return true on
    /// a partial persist).
    #[tracing::instrument(skip(self, artifact))]
    pub async fn exists(&self, artifact: &Artifact) -> IngestResult<bool> {
        let id = artifact.artifact_id();
        let row = self.lineage.get_artifact(&id).await?;
        let Some(_row) = row else {
            return Ok(false);
        };

        if has_blob(artifact) {
            return self
                .blob_store
                .object_exists(&self.bucket, &artifact.object_key())
                .await;
        }

        Ok(true)
    }

    /// Persist an artifact: upload its blob (if any) first, then write
    /// its lineage row and parent edge in that order (spec §4.1). A
    /// blob that lands without a lineage row is recoverable — a retry
    /// simply re-persists and overwrites the same content-addressed
    /// key — but a lineage row without its blob would advertise an
    /// artifact no reader could fetch, so the order is never reversed.
    #[tracing::instrument(skip(self, artifact, payload))]
    pub async fn persist(&self, artifact: &Artifact, payload: Payload) -> IngestResult<()> {
        let id = artifact.artifact_id();

        if !matches!(artifact, Artifact::Video(_)) {
            let parent_id = artifact.parent_artifact_id().ok_or_else(|| {
                ArtifactError::new(ArtifactErrorKind::InvalidArtifact(format!(
                    "artifact {id} has no parent_artifact_id"
                )))
            })?;
            if self.lineage.get_artifact(parent_id).await?.is_none() {
                return Err(ArtifactError::new(ArtifactErrorKind::MissingParent(
                    parent_id.to_string(),
                ))
                .into());
            }
        }

        self.upload_payload(artifact, payload).await?;

        let payload_json = serde_json::to_value(artifact)
            .map_err(|e| ingest_error::JsonError::new(e.to_string()))?;
        let parent_ids: Vec<String> = artifact
            .parent_artifact_id()
            .map(|p| vec![p.to_string()])
            .unwrap_or_default();

        self.lineage
            .save_artifact(&id, &artifact.to_string(), artifact.video_id(), payload_json, &parent_ids)
            .await
            .map_err(|e| {
                ArtifactError::new(ArtifactErrorKind::PartialPersist {
                    artifact_id: id.clone(),
                    reason: e.to_string(),
                })
                .into()
            })
    }

    async fn upload_payload(&self, artifact: &Artifact, payload: Payload) -> IngestResult<()> {
        match payload {
            Payload::Json(value) => {
                self.blob_store.ensure_bucket(&self.bucket).await?;
                self.blob_store
                    .put_json(&self.bucket, &artifact.object_key(), &value)
                    .await
            }
            Payload::Bytes(bytes) => {
                self.blob_store.ensure_bucket(&self.bucket).await?;
                self.blob_store
                    .put_object(&self.bucket, &artifact.object_key(), &bytes, artifact.content_type())
                    .await
            }
            Payload::None => Ok(()),
        }
    }

    /// The blob store backing this visitor, for callers that need the
    /// bucket/URL directly (e.g. vector-ingest stages resolving a
    /// `minio_url` field).
    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blob_store
    }

    /// The bucket every artifact is written under.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The underlying lineage tracker, for callers (the deleter,
    /// status reporter) that walk the DAG directly.
    pub fn lineage(&self) -> &LineageTracker {
        &self.lineage
    }
}

fn has_blob(artifact: &Artifact) -> bool {
    // `Video.blob_url` is externally supplied (spec §3.1) — the source
    // file itself is never copied into our bucket. Every other variant,
    // including embeddings (stored as `.npy` blobs, spec §4.8.9), is
    // uploaded under its own `object_key` by the task that produces it.
    !matches!(artifact, Artifact::Video(_))
}

/// A thin facade bundling the three backends a full pipeline run needs
/// (blob store, lineage tracker, vector index) behind the one visitor
/// plus the vector client pipeline stages need directly for inserts.
#[derive(Clone)]
pub struct StoreContext {
    /// The persistence visitor (blob + lineage).
    pub visitor: PersistenceVisitor,
    /// The vector index client, used only by embedding-ingest stages.
    pub vector: Arc<VectorIndexClient>,
}
