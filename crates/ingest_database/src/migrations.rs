//! Embedded schema migrations, run at process startup.

use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use ingest_error::{DatabaseError, DatabaseErrorKind, IngestResult};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply any pending migrations.
pub fn run_migrations(conn: &mut PgConnection) -> IngestResult<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())).into())
}
