//! Vector index client error types.

/// Conditions the vector index client can encounter.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
pub enum VectorErrorKind {
    /// Failed to create a collection or its index.
    #[display("collection creation failed: {}", _0)]
    CollectionCreation(#[error(not(source))] String),
    /// Failed to insert rows.
    #[display("insert failed: {}", _0)]
    InsertFailed(#[error(not(source))] String),
    /// Failed to query or count rows.
    #[display("query failed: {}", _0)]
    QueryFailed(#[error(not(source))] String),
    /// Failed to delete rows.
    #[display("delete failed: {}", _0)]
    DeleteFailed(#[error(not(source))] String),
    /// Collection exists but is not loaded for query/delete.
    #[display("collection '{}' is not loaded", _0)]
    CollectionNotLoaded(#[error(not(source))] String),
    /// Underlying transport/connection failure.
    #[display("transport error: {}", _0)]
    Transport(#[error(not(source))] String),
}

/// Vector index error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Vector Error: {kind} at line {line} in {file}")]
pub struct VectorError {
    /// Kind of failure.
    #[error(source)]
    pub kind: VectorErrorKind,
    /// Line number where the error occurred.
    pub line: u32,
    /// File where the error occurred.
    pub file: &'static str,
}

impl VectorError {
    /// Create a new VectorError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: VectorErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
