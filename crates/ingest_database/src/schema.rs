//! Diesel table definitions for the lineage tracker (spec §6.4).

diesel::table! {
    artifacts_application (id) {
        /// Content-addressed artifact id (spec §4.1).
        id -> Text,
        artifact_type -> Text,
        video_id -> Text,
        payload -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    artifact_lineage_application (id) {
        id -> Uuid,
        parent_id -> Text,
        child_id -> Text,
        transformation_type -> Text,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(artifact_lineage_application -> artifacts_application (parent_id));
diesel::allow_tables_to_appear_in_same_query!(artifacts_application, artifact_lineage_application);
