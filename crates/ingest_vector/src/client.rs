//! Base vector index client (spec §4.5): collection lifecycle, batched
//! insert, existence checks for dedup, and filtered delete.
//!
//! Grounded on the Qdrant-backed indexer's `ensure_collections` /
//! `delete_repo_points` / `collection_exists` shape; the reference
//! deployment targets Milvus, which models collections as
//! explicitly load/unload-able, so `ensure_loaded` is kept as an
//! explicit step even though Qdrant collections are always queryable
//! once created — it degrades to a plain existence check.

use qdrant_client::qdrant::{
    vectors_config::Config as VectorsConfigEnum, CountPointsBuilder, CreateCollectionBuilder,
    DeletePointsBuilder, Distance, Filter, PointStruct, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};

use ingest_error::{IngestResult, VectorError, VectorErrorKind};

use crate::point::{point_id_for, VectorRow};

/// Client bound to a single Qdrant deployment.
pub struct VectorIndexClient {
    client: Qdrant,
}

impl VectorIndexClient {
    /// Connect to the vector service at `url` (e.g. `http://qdrant:6334`).
    #[tracing::instrument]
    pub fn connect(url: &str) -> IngestResult<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorError::new(VectorErrorKind::Transport(e.to_string())))?;
        Ok(Self { client })
    }

    /// Create `collection` with the given vector dimensionality if it
    /// does not already exist. Idempotent (spec §6: "created lazily").
    #[tracing::instrument(skip(self))]
    pub async fn ensure_collection(&self, collection: &str, vector_size: u64) -> IngestResult<()> {
        let exists = self.client.collection_exists(collection).await.map_err(|e| {
            VectorError::new(VectorErrorKind::Transport(e.to_string()))
        })?;
        if exists {
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(collection).vectors_config(VectorsConfigEnum::Params(
                    VectorParamsBuilder::new(vector_size, Distance::Cosine).build(),
                )),
            )
            .await
            .map_err(|e| VectorError::new(VectorErrorKind::CollectionCreation(e.to_string())))?;

        Ok(())
    }

    /// Confirm `collection` is reachable before a query/delete.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_loaded(&self, collection: &str) -> IngestResult<()> {
        let exists = self.client.collection_exists(collection).await.map_err(|e| {
            VectorError::new(VectorErrorKind::Transport(e.to_string()))
        })?;
        if exists {
            Ok(())
        } else {
            Err(VectorError::new(VectorErrorKind::CollectionNotLoaded(collection.to_string())).into())
        }
    }

    /// Upsert `rows` into `collection`.
    #[tracing::instrument(skip(self, rows), fields(count = rows.len()))]
    pub async fn insert(&self, collection: &str, rows: Vec<VectorRow>) -> IngestResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            let payload: Payload = serde_json::Value::Object(row.payload)
                .try_into()
                .map_err(|e: qdrant_client::QdrantError| {
                    VectorError::new(VectorErrorKind::InsertFailed(e.to_string()))
                })?;
            points.push(PointStruct::new(
                point_id_for(&row.artifact_id),
                row.embedding,
                payload,
            ));
        }

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| VectorError::new(VectorErrorKind::InsertFailed(e.to_string())))?;

        Ok(())
    }

    /// Whether any row in `collection` matches `filter`.
    #[tracing::instrument(skip(self, filter))]
    pub async fn exists(&self, collection: &str, filter: Filter) -> IngestResult<bool> {
        let result = self
            .client
            .count(CountPointsBuilder::new(collection).filter(filter).exact(true))
            .await
            .map_err(|e| VectorError::new(VectorErrorKind::QueryFailed(e.to_string())))?;

        let count = result
            .result
            .ok_or_else(|| VectorError::new(VectorErrorKind::QueryFailed("missing count result".into())))?
            .count;

        Ok(count > 0)
    }

    /// Dedup check for the shared filter shape (spec §4.6): `id ==
    /// <artifact_id> and related_video_id == <video_id> and
    /// user_bucket == <user_bucket>`.
    pub async fn exists_by(
        &self,
        collection: &str,
        artifact_id: &str,
        video_id: &str,
        user_bucket: &str,
    ) -> IngestResult<bool> {
        let filter = Filter::must([
            qdrant_client::qdrant::Condition::matches("id", artifact_id.to_string()),
            qdrant_client::qdrant::Condition::matches("related_video_id", video_id.to_string()),
            qdrant_client::qdrant::Condition::matches("user_bucket", user_bucket.to_string()),
        ]);
        self.exists(collection, filter).await
    }

    /// Delete every row in `collection` matching `filter`.
    #[tracing::instrument(skip(self, filter))]
    pub async fn delete_by_filter(&self, collection: &str, filter: Filter) -> IngestResult<()> {
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter))
            .await
            .map_err(|e| VectorError::new(VectorErrorKind::DeleteFailed(e.to_string())))?;
        Ok(())
    }

    /// Count rows in `collection` matching `filter` (spec §4.10:
    /// per-collection vector counts in the status report).
    #[tracing::instrument(skip(self, filter))]
    pub async fn count(&self, collection: &str, filter: Filter) -> IngestResult<u64> {
        let result = self
            .client
            .count(CountPointsBuilder::new(collection).filter(filter).exact(true))
            .await
            .map_err(|e| VectorError::new(VectorErrorKind::QueryFailed(e.to_string())))?;

        Ok(result
            .result
            .ok_or_else(|| VectorError::new(VectorErrorKind::QueryFailed("missing count result".into())))?
            .count)
    }
}

/// Build a filter matching a single `related_video_id` field, used by
/// the cascading deleter and status reporter.
pub fn video_id_filter(video_id: &str) -> Filter {
    Filter::must([qdrant_client::qdrant::Condition::matches(
        "related_video_id",
        video_id.to_string(),
    )])
}

/// Build a filter matching a single row's `id` (artifact id) field,
/// used by the cascading deleter's stage-scoped delete (spec §4.9:
/// scoped to specific descendant artifact ids, not a blanket
/// `related_video_id` wipe).
pub fn artifact_id_filter(artifact_id: &str) -> Filter {
    Filter::must([qdrant_client::qdrant::Condition::matches(
        "id",
        artifact_id.to_string(),
    )])
}
