//! Translate an [`IngestError`] into an HTTP response. Kept separate
//! from the handlers so every route shares one mapping from error kind
//! to status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use ingest_error::{DatabaseErrorKind, IngestError, IngestErrorKind};
use serde_json::json;

/// Newtype so [`IngestError`] (defined in another crate) can implement
/// [`IntoResponse`] here without violating the orphan rule.
pub struct ApiError(pub IngestError);

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self(err)
    }
}

fn status_for(kind: &IngestErrorKind) -> StatusCode {
    match kind {
        IngestErrorKind::Database(e) if e.kind == DatabaseErrorKind::NotFound => StatusCode::NOT_FOUND,
        IngestErrorKind::Registry(e) if e.is_retryable() => StatusCode::BAD_GATEWAY,
        IngestErrorKind::Registry(_) => StatusCode::SERVICE_UNAVAILABLE,
        IngestErrorKind::Database(_) | IngestErrorKind::Storage(_) | IngestErrorKind::Vector(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        IngestErrorKind::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IngestErrorKind::Artifact(_) | IngestErrorKind::Json(_) => StatusCode::BAD_REQUEST,
        IngestErrorKind::Http(_) => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        tracing::error!(error = %self.0, "request failed");
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_error::DatabaseError;

    #[test]
    fn not_found_maps_to_404() {
        let kind = IngestErrorKind::Database(DatabaseError::new(DatabaseErrorKind::NotFound));
        assert_eq!(status_for(&kind), StatusCode::NOT_FOUND);
    }

    #[test]
    fn other_database_errors_map_to_500() {
        let kind = IngestErrorKind::Database(DatabaseError::new(DatabaseErrorKind::Query("boom".into())));
        assert_eq!(status_for(&kind), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
