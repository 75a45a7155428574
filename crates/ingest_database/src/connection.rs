//! Connection pooling.

use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use ingest_error::{DatabaseError, DatabaseErrorKind, IngestResult};

/// A pooled Postgres connection manager.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Build a connection pool for `database_url`.
pub fn build_pool(database_url: &str, max_size: u32) -> IngestResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::PoolExhausted(e.to_string())).into())
}
