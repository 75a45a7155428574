//! Artifact lineage tracker (spec §4.2): a relational record of every
//! artifact ever persisted and the parent/child edges between them,
//! used by the cascading deleter (spec §4.9) and status reporter
//! (spec §4.10) to walk the DAG without touching the pipeline stages
//! themselves.

use std::collections::{HashSet, VecDeque};

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use ingest_error::{DatabaseError, DatabaseErrorKind, IngestError, IngestResult};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::connection::PgPool;
use crate::models::{ArtifactRow, NewLineageEdgeRow};
use crate::schema::{artifact_lineage_application, artifacts_application};

/// Database-backed lineage tracker.
#[derive(Clone)]
pub struct LineageTracker {
    pool: PgPool,
}

impl LineageTracker {
    /// Wrap a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run pending migrations against the pool's database.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&self) -> IngestResult<()> {
        let pool = self.pool.clone();
        run_blocking(pool, move |conn| crate::migrations::run_migrations(conn)).await
    }

    /// Upsert an artifact row and record its edges from `parent_ids`.
    /// Content-addressed ids make this idempotent: re-persisting the
    /// same artifact overwrites the same row and edges are
    /// deduplicated by the table's unique constraint.
    #[tracing::instrument(skip(self, payload, parent_ids))]
    pub async fn save_artifact(
        &self,
        id: &str,
        artifact_type: &str,
        video_id: &str,
        payload: JsonValue,
        parent_ids: &[String],
    ) -> IngestResult<()> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let artifact_type = artifact_type.to_string();
        let video_id = video_id.to_string();
        let parent_ids = parent_ids.to_vec();

        run_blocking(pool, move |conn| {
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let row = ArtifactRow {
                    id: id.clone(),
                    artifact_type: artifact_type.clone(),
                    video_id: video_id.clone(),
                    payload: payload.clone(),
                    created_at: Utc::now(),
                };

                diesel::insert_into(artifacts_application::table)
                    .values(&row)
                    .on_conflict(artifacts_application::id)
                    .do_update()
                    .set((
                        artifacts_application::artifact_type.eq(&row.artifact_type),
                        artifacts_application::video_id.eq(&row.video_id),
                        artifacts_application::payload.eq(&row.payload),
                    ))
                    .execute(conn)?;

                for parent_id in &parent_ids {
                    let edge = NewLineageEdgeRow {
                        id: Uuid::new_v4(),
                        parent_id: parent_id.clone(),
                        child_id: id.clone(),
                        transformation_type: artifact_type.clone(),
                        created_at: Utc::now(),
                    };
                    diesel::insert_into(artifact_lineage_application::table)
                        .values(&edge)
                        .on_conflict((
                            artifact_lineage_application::parent_id,
                            artifact_lineage_application::child_id,
                        ))
                        .do_nothing()
                        .execute(conn)?;
                }

                Ok(())
            })
            .map_err(DatabaseError::from)
            .map_err(Into::into)
        })
        .await
    }

    /// Look up a single artifact by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_artifact(&self, id: &str) -> IngestResult<Option<ArtifactRow>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        run_blocking(pool, move |conn| {
            artifacts_application::table
                .find(&id)
                .first(conn)
                .optional()
                .map_err(DatabaseError::from)
                .map_err(Into::into)
        })
        .await
    }

    /// Every artifact row recorded for `video_id`, the root `Video`
    /// artifact included. `video_id` is an indexed column (see
    /// DESIGN.md's schema-shape note) precisely so the deleter and
    /// status reporter can answer "what exists for this video" without
    /// already knowing the root artifact's content-addressed id.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_video(&self, video_id: &str) -> IngestResult<Vec<ArtifactRow>> {
        let pool = self.pool.clone();
        let video_id = video_id.to_string();
        run_blocking(pool, move |conn| {
            artifacts_application::table
                .filter(artifacts_application::video_id.eq(&video_id))
                .select(ArtifactRow::as_select())
                .load(conn)
                .map_err(DatabaseError::from)
                .map_err(Into::into)
        })
        .await
    }

    /// Direct children of `id`, optionally restricted to `filter_types`.
    #[tracing::instrument(skip(self, filter_types))]
    pub async fn get_children(
        &self,
        id: &str,
        filter_types: Option<&[String]>,
    ) -> IngestResult<Vec<ArtifactRow>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        let filter_types = filter_types.map(|t| t.to_vec());
        run_blocking(pool, move |conn| {
            let rows = child_rows(conn, &id)?;
            Ok(match filter_types {
                Some(types) => rows
                    .into_iter()
                    .filter(|row| types.contains(&row.artifact_type))
                    .collect(),
                None => rows,
            })
        })
        .await
    }

    /// Every artifact reachable from `id` by following child edges,
    /// breadth-first with a visited-set guard so a malformed graph
    /// with a cycle cannot loop forever.
    #[tracing::instrument(skip(self))]
    pub async fn get_descendants(&self, id: &str) -> IngestResult<Vec<ArtifactRow>> {
        let pool = self.pool.clone();
        let id = id.to_string();
        run_blocking(pool, move |conn| descendant_rows(conn, &id)).await
    }

    /// Delete each id in `root_ids` and every artifact reachable from
    /// it, along with their lineage edges (spec §4.9: scoped cascading
    /// delete). Returns every deleted artifact id.
    #[tracing::instrument(skip(self, root_ids))]
    pub async fn delete_subtree(&self, root_ids: &[String]) -> IngestResult<Vec<String>> {
        let pool = self.pool.clone();
        let root_ids = root_ids.to_vec();
        run_blocking(pool, move |conn| {
            let mut ids: HashSet<String> = HashSet::new();
            for root_id in &root_ids {
                ids.insert(root_id.clone());
                for descendant in descendant_rows(conn, root_id)? {
                    ids.insert(descendant.id);
                }
            }
            let ids: Vec<String> = ids.into_iter().collect();

            diesel::delete(
                artifacts_application::table.filter(artifacts_application::id.eq_any(&ids)),
            )
            .execute(conn)
            .map_err(DatabaseError::from)?;

            Ok(ids)
        })
        .await
    }
}

fn child_rows(
    conn: &mut PgConnection,
    parent_id: &str,
) -> Result<Vec<ArtifactRow>, ingest_error::IngestError> {
    artifact_lineage_application::table
        .filter(artifact_lineage_application::parent_id.eq(parent_id))
        .inner_join(
            artifacts_application::table
                .on(artifacts_application::id.eq(artifact_lineage_application::child_id)),
        )
        .select(ArtifactRow::as_select())
        .load(conn)
        .map_err(DatabaseError::from)
        .map_err(Into::into)
}

fn descendant_rows(
    conn: &mut PgConnection,
    root_id: &str,
) -> Result<Vec<ArtifactRow>, ingest_error::IngestError> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([root_id.to_string()]);
    let mut out = Vec::new();

    while let Some(current) = queue.pop_front() {
        for child in child_rows(conn, &current)? {
            if visited.insert(child.id.clone()) {
                queue.push_back(child.id.clone());
                out.push(child);
            }
        }
    }

    Ok(out)
}

async fn run_blocking<F, T>(pool: PgPool, f: F) -> IngestResult<T>
where
    F: FnOnce(&mut PgConnection) -> IngestResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::PoolExhausted(e.to_string())))?;
        f(&mut conn)
    })
    .await
    .map_err(|e| IngestError::from(DatabaseError::new(DatabaseErrorKind::Query(e.to_string()))))?
}
