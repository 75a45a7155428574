//! Top-level error wrapper types.

use crate::{
    ArtifactError, ConfigError, HttpError, JsonError, RegistryError, StorageError, VectorError,
};
#[cfg(feature = "database")]
use crate::DatabaseError;

/// The aggregate error kind for the ingestion pipeline. Every crate's
/// own `*Error` converts into this via `derive_more::From`, matching
/// spec §7's error kinds: input-invalid, dependency-unavailable,
/// partial-persist, model error, and data-corruption are all expressed
/// as combinations of the variants below.
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum IngestErrorKind {
    /// HTTP error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Blob store error
    #[from(StorageError)]
    Storage(StorageError),
    /// Lineage tracker (database) error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Service registry / microservice client error
    #[from(RegistryError)]
    Registry(RegistryError),
    /// Vector index client error
    #[from(VectorError)]
    Vector(VectorError),
    /// Artifact model / persistence visitor error
    #[from(ArtifactError)]
    Artifact(ArtifactError),
}

/// Ingestion pipeline error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Ingest Error: {}", _0)]
pub struct IngestError(Box<IngestErrorKind>);

impl IngestError {
    /// Create a new error from a kind.
    pub fn new(kind: IngestErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &IngestErrorKind {
        &self.0
    }

    /// Whether this error describes a condition worth retrying (spec
    /// §4.4/§7: transport failures and 5xx are retryable, 4xx is not).
    pub fn is_retryable(&self) -> bool {
        match self.kind() {
            IngestErrorKind::Registry(e) => e.is_retryable(),
            #[cfg(feature = "database")]
            IngestErrorKind::Database(e) => e.kind.is_retryable(),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to IngestErrorKind
impl<T> From<T> for IngestError
where
    T: Into<IngestErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for ingestion pipeline operations.
pub type IngestResult<T> = std::result::Result<T, IngestError>;
