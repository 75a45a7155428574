//! Filesystem-backed blob store, used by tests and local development in
//! place of a real MinIO instance.
//!
//! Objects are stored at `{base_path}/{bucket}/{key}`, atomically via a
//! temp-file-then-rename write, matching the teacher storage crate's
//! filesystem backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ingest_error::{IngestResult, StorageError, StorageErrorKind};

use crate::BlobStore;

/// Filesystem blob store.
pub struct FileSystemBlobStore {
    base_path: PathBuf,
}

impl FileSystemBlobStore {
    /// Create a new filesystem blob store rooted at `base_path`.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> IngestResult<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;
        Ok(Self { base_path })
    }

    fn path_for(&self, bucket: &str, key: &str) -> PathBuf {
        self.base_path.join(bucket).join(key)
    }
}

#[async_trait::async_trait]
impl BlobStore for FileSystemBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> IngestResult<()> {
        let dir = self.base_path.join(bucket);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
        _content_type: &str,
    ) -> IngestResult<()> {
        let path = self.path_for(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let temp_path = path.with_extension("tmp");
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> IngestResult<Option<Vec<u8>>> {
        let path = self.path_for(bucket, key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> IngestResult<bool> {
        let path = self.path_for(bucket, key);
        Ok(tokio::fs::try_exists(path).await.unwrap_or(false))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> IngestResult<Vec<String>> {
        let dir = self.base_path.join(bucket);
        let mut keys = Vec::new();
        walk(&dir, &dir, prefix, &mut keys)?;
        Ok(keys)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> IngestResult<()> {
        let path = self.path_for(bucket, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::new(StorageErrorKind::FileWrite(format!(
                "delete {}: {}",
                path.display(),
                e
            )))
            .into()),
        }
    }

    async fn get_presigned_url(
        &self,
        _bucket: &str,
        _key: &str,
        _expires_in: Duration,
    ) -> IngestResult<Option<String>> {
        Ok(None)
    }
}

fn walk(root: &Path, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> IngestResult<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir).map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
    })? {
        let entry = entry.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!("{}: {}", dir.display(), e)))
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, prefix, keys)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let key = relative.to_string_lossy().replace('\\', "/");
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemBlobStore::new(dir.path()).unwrap();
        store.ensure_bucket("tenant").await.unwrap();
        store
            .put_object("tenant", "images/v1/1.webp", b"data", "image/webp")
            .await
            .unwrap();

        let read = store.get_object("tenant", "images/v1/1.webp").await.unwrap();
        assert_eq!(read, Some(b"data".to_vec()));
    }

    #[tokio::test]
    async fn missing_object_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemBlobStore::new(dir.path()).unwrap();
        let read = store.get_object("tenant", "nope").await.unwrap();
        assert_eq!(read, None);
    }

    #[tokio::test]
    async fn list_objects_filters_by_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSystemBlobStore::new(dir.path()).unwrap();
        store.put_object("t", "images/v1/1.webp", b"a", "image/webp").await.unwrap();
        store.put_object("t", "images/v2/1.webp", b"b", "image/webp").await.unwrap();
        let keys = store.list_objects("t", "images/v1").await.unwrap();
        assert_eq!(keys, vec!["images/v1/1.webp".to_string()]);
    }
}
