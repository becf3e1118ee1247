//! Embedded schema for the local database.
//!
//! Files in `migrations/sqlite/` are applied in order and tracked in
//! `_sqlx_migrations`. Add a new `NNN_name.sql`; never edit an applied one.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub(crate) async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    debug!(count = MIGRATOR.migrations.len(), "Local schema up to date");
    Ok(())
}

/// `(known, applied)` migration counts.
#[cfg(test)]
pub(crate) async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    Ok((MIGRATOR.migrations.len(), applied as usize))
}
