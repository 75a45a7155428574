//! Point identity and the generic row shape every collection inserts.
//!
//! Qdrant point ids must be a `u64` or a UUID; this system's artifact
//! ids are SHA-512 hex digests (spec §3.1), so the point id used on
//! the wire is a UUID deterministically derived from the artifact id
//! (v5, so the same artifact id always maps to the same point and a
//! re-insert overwrites rather than duplicates). The artifact id
//! itself is still carried as the `id` scalar field spec §3.4 requires
//! collections to be keyed by, and every dedup/lookup in this crate
//! filters on that field, never on the wire-level point id.

use qdrant_client::qdrant::PointId;
use uuid::Uuid;

/// Derive the Qdrant point id for a content-addressed artifact id.
pub fn point_id_for(artifact_id: &str) -> PointId {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, artifact_id.as_bytes())
        .to_string()
        .into()
}

/// A row ready to upsert: the embedding vector plus its scalar
/// payload fields (including the collection-keying `id` field).
#[derive(Debug, Clone)]
pub struct VectorRow {
    /// The content-addressed artifact id this row represents.
    pub artifact_id: String,
    /// The embedding vector.
    pub embedding: Vec<f32>,
    /// Scalar fields, spec §4.6 per collection.
    pub payload: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_artifact_id_yields_same_point_id() {
        assert_eq!(point_id_for("abc123"), point_id_for("abc123"));
    }

    #[test]
    fn different_artifact_ids_yield_different_point_ids() {
        assert_ne!(point_id_for("abc123"), point_id_for("def456"));
    }
}
