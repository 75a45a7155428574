//! Row types for the lineage tables.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::schema::{artifact_lineage_application, artifacts_application};

/// A persisted artifact record (spec §4.1/§4.2): content-addressed id,
/// its type tag, the video it belongs to, and its serialized payload.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = artifacts_application)]
#[diesel(primary_key(id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ArtifactRow {
    /// Content-addressed artifact id.
    pub id: String,
    /// Artifact type tag, e.g. `"segment"` or `"image_embedding"`.
    pub artifact_type: String,
    /// The video this artifact traces back to.
    pub video_id: String,
    /// The artifact's own fields, serialized as JSON.
    pub payload: JsonValue,
    /// When this row was first written.
    pub created_at: DateTime<Utc>,
}

/// A parent/child edge in the artifact DAG (spec §4.2).
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = artifact_lineage_application)]
#[diesel(primary_key(id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LineageEdgeRow {
    /// Surrogate key for the edge.
    pub id: Uuid,
    /// The upstream artifact's id.
    pub parent_id: String,
    /// The downstream artifact's id.
    pub child_id: String,
    /// The child's artifact type, recorded as the edge's transformation
    /// (one stage produces exactly one artifact type).
    pub transformation_type: String,
    /// When the edge was recorded.
    pub created_at: DateTime<Utc>,
}

/// A new edge, for insertion (id and created_at are assigned server-side).
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = artifact_lineage_application)]
pub struct NewLineageEdgeRow {
    /// Surrogate key for the edge.
    pub id: Uuid,
    /// The upstream artifact's id.
    pub parent_id: String,
    /// The downstream artifact's id.
    pub child_id: String,
    /// The child's artifact type, recorded as the edge's transformation.
    pub transformation_type: String,
    /// When the edge was recorded.
    pub created_at: DateTime<Utc>,
}
