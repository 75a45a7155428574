//! Blob store trait definition.
//!
//! Spec §3.3 / §4.3: a bucketed object store keyed by `user_bucket`.
//! Writes are put-once using the caller's content-addressed object key;
//! reads distinguish "absent" (`Ok(None)`) from genuine failures.

use std::time::Duration;

use ingest_error::IngestResult;

/// Pluggable blob storage backend.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Ensure the named bucket exists, creating it on first use.
    async fn ensure_bucket(&self, bucket: &str) -> IngestResult<()>;

    /// Write `data` under `key` within `bucket`. Put-once: callers are
    /// expected to use content-addressed keys, so a repeated put with
    /// identical content is a harmless no-op from the caller's
    /// perspective.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> IngestResult<()>;

    /// Read the object at `key`. Returns `Ok(None)` if the object does
    /// not exist; any other failure surfaces as `Err`.
    async fn get_object(&self, bucket: &str, key: &str) -> IngestResult<Option<Vec<u8>>>;

    /// Whether an object exists at `key`.
    async fn object_exists(&self, bucket: &str, key: &str) -> IngestResult<bool>;

    /// List object keys under `prefix` within `bucket`.
    async fn list_objects(&self, bucket: &str, prefix: &str) -> IngestResult<Vec<String>>;

    /// Delete the object at `key`. Missing objects are treated as
    /// already-deleted (no error), matching the cascading deleter's
    /// at-least-once semantics (spec §4.9).
    async fn delete_object(&self, bucket: &str, key: &str) -> IngestResult<()>;

    /// A temporary direct-access URL, if the backend supports one.
    async fn get_presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> IngestResult<Option<String>>;

    /// Write `value` as compact JSON under `key` (spec §4.3: "JSON
    /// helpers emit compact encoding").
    async fn put_json(
        &self,
        bucket: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> IngestResult<()> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| ingest_error::JsonError::new(e.to_string()))?;
        self.put_object(bucket, key, &bytes, "application/json").await
    }

    /// Read and parse a JSON object; `Ok(None)` if absent.
    async fn get_json(&self, bucket: &str, key: &str) -> IngestResult<Option<serde_json::Value>> {
        match self.get_object(bucket, key).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes)
                    .map_err(|e| ingest_error::JsonError::new(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
