//! Blob storage error types.

/// Kinds of storage failures.
///
/// Covers both the filesystem backend (kept from the original media
/// storage crate) and the S3/MinIO-compatible backend the ingestion
/// pipeline's blob store uses.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
pub enum StorageErrorKind {
    /// Failed to create a directory.
    #[display("directory creation failed: {_0}")]
    DirectoryCreation(#[error(not(source))] String),
    /// Failed to write a file.
    #[display("file write failed: {_0}")]
    FileWrite(#[error(not(source))] String),
    /// Failed to read a file.
    #[display("file read failed: {_0}")]
    FileRead(#[error(not(source))] String),
    /// Requested object does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Path is invalid for the backend.
    #[display("invalid path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// Permission denied accessing storage.
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Storage backend misconfigured.
    #[display("invalid configuration: {_0}")]
    InvalidConfig(#[error(not(source))] String),
    /// Storage backend temporarily unavailable.
    #[display("storage unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// Failed to create or verify the bucket.
    #[display("bucket creation failed: {_0}")]
    BucketCreation(#[error(not(source))] String),
    /// Failed to generate a presigned URL.
    #[display("presigned url generation failed: {_0}")]
    PresignedUrl(#[error(not(source))] String),
    /// Object exists but its content is unreadable or corrupt.
    #[display("data corruption: {_0}")]
    DataCorruption(#[error(not(source))] String),
}

/// Storage error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {kind} at line {line} in {file}")]
pub struct StorageError {
    /// Kind of storage failure.
    #[error(source)]
    pub kind: StorageErrorKind,
    /// Line number where the error occurred.
    pub line: u32,
    /// File where the error occurred.
    pub file: &'static str,
}

impl StorageError {
    /// Create a new StorageError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True if the failure is an absent-object condition rather than a
    /// transport or corruption failure. Read callers that want
    /// "missing reads return null" semantics (spec §4.3) check this.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StorageErrorKind::NotFound(_))
    }
}
