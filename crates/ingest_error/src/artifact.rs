//! Artifact model and persistence error types.

/// Conditions the artifact model and persistence visitor can encounter.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
pub enum ArtifactErrorKind {
    /// Request described an artifact that fails its own invariants
    /// (missing fields, unknown artifact_type tag).
    #[display("invalid artifact: {}", _0)]
    InvalidArtifact(#[error(not(source))] String),
    /// A non-Video artifact was persisted without a parent already
    /// present in the lineage store.
    #[display("missing parent artifact: {}", _0)]
    MissingParent(#[error(not(source))] String),
    /// Blob was uploaded but the lineage row failed to write; caller
    /// should treat this the same as "not yet persisted" and retry.
    #[display("partial persist for artifact {}: {}", artifact_id, reason)]
    PartialPersist {
        /// Content-addressed id of the artifact.
        artifact_id: String,
        /// Underlying reason the lineage write failed.
        reason: String,
    },
}

/// Artifact error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Artifact Error: {kind} at line {line} in {file}")]
pub struct ArtifactError {
    /// Kind of failure.
    #[error(source)]
    pub kind: ArtifactErrorKind,
    /// Line number where the error occurred.
    pub line: u32,
    /// File where the error occurred.
    pub file: &'static str,
}

impl ArtifactError {
    /// Create a new ArtifactError with the given kind at the current location.
    #[track_caller]
    pub fn new(kind: ArtifactErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
