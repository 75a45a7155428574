//! S3/MinIO-compatible blob store backend.
//!
//! MinIO speaks the S3 API, so the production backend for spec §3.3/§4.3
//! is built on `aws-sdk-s3` pointed at a MinIO (or any S3-compatible)
//! endpoint via a custom `endpoint_url` and path-style addressing.

use std::time::Duration;

use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use ingest_error::{IngestResult, StorageError, StorageErrorKind};

use crate::BlobStore;

/// Configuration for connecting to an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// e.g. `http://minio:9000`.
    pub endpoint: String,
    /// AWS region; MinIO ignores this but the SDK requires a value.
    pub region: String,
    /// Access key.
    pub access_key: String,
    /// Secret key.
    pub secret_key: String,
}

/// Blob store backed by an S3-compatible object store.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
}

impl S3BlobStore {
    /// Build a client against the given endpoint using path-style
    /// addressing (required by MinIO).
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            config.access_key,
            config.secret_key,
            None,
            None,
            "ingest-storage",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .region(aws_sdk_s3::config::Region::new(config.region))
            .endpoint_url(config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }

    /// Build a client from a pre-built SDK client, for tests that point
    /// at a local MinIO container with their own configuration.
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    #[tracing::instrument(skip(self))]
    async fn ensure_bucket(&self, bucket: &str) -> IngestResult<()> {
        let head = self.client.head_bucket().bucket(bucket).send().await;
        if head.is_ok() {
            return Ok(());
        }

        tracing::debug!(bucket, "bucket missing, creating");
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::BucketCreation(format!("{bucket}: {e}")))
            })?;
        Ok(())
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> IngestResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!("{bucket}/{key}: {e}")))
            })?;

        tracing::info!(bucket, key, size = data.len(), "stored object");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_object(&self, bucket: &str, key: &str) -> IngestResult<Option<Vec<u8>>> {
        let result = self.client.get_object().bucket(bucket).key(key).send().await;
        match result {
            Ok(output) => {
                let bytes = output.body.collect().await.map_err(|e| {
                    StorageError::new(StorageErrorKind::FileRead(format!("{bucket}/{key}: {e}")))
                })?;
                Ok(Some(bytes.into_bytes().to_vec()))
            }
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    Ok(None)
                } else {
                    Err(StorageError::new(StorageErrorKind::FileRead(format!(
                        "{bucket}/{key}: {e}"
                    )))
                    .into())
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn object_exists(&self, bucket: &str, key: &str) -> IngestResult<bool> {
        let result = self.client.head_object().bucket(bucket).key(key).send().await;
        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(StorageError::new(StorageErrorKind::Unavailable(format!(
                        "{bucket}/{key}: {e}"
                    )))
                    .into())
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn list_objects(&self, bucket: &str, prefix: &str) -> IngestResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix);
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request.send().await.map_err(|e| {
                StorageError::new(StorageErrorKind::Unavailable(format!(
                    "list {bucket}/{prefix}: {e}"
                )))
            })?;

            for object in output.contents() {
                if let Some(key) = object.key() {
                    keys.push(key.to_string());
                }
            }

            if output.is_truncated().unwrap_or(false) {
                continuation_token = output.next_continuation_token().map(str::to_string);
            } else {
                break;
            }
        }

        Ok(keys)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_object(&self, bucket: &str, key: &str) -> IngestResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "delete {bucket}/{key}: {e}"
                )))
            })?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_presigned_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> IngestResult<Option<String>> {
        let config = PresigningConfig::expires_in(expires_in).map_err(|e| {
            StorageError::new(StorageErrorKind::PresignedUrl(e.to_string()))
        })?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| {
                StorageError::new(StorageErrorKind::PresignedUrl(format!(
                    "{bucket}/{key}: {e}"
                )))
            })?;

        Ok(Some(presigned.uri().to_string()))
    }
}
