//! Schema setup for the galaxy store.
//!
//! `001` creates the scan and body tables, `002` seeds the mission
//! catalogue. Both are compiled into the binary with `sqlx::migrate!`.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Bring the schema up to date. Safe to call on every start; a store that is
/// already current is left untouched.
///
/// # Errors
/// Returns `DatabaseError::Migration` when a script fails.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::debug!("Applying up to {} schema migrations", migrator.iter().count());

    migrator
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("cannot apply schema: {e}")))?;

    tracing::info!("Galaxy store schema is current");
    Ok(())
}

/// Highest applied schema version; 0 for a fresh store.
///
/// # Errors
/// Returns `DatabaseError` if the bookkeeping table cannot be read.
pub async fn get_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let tracked: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;
    if tracked.is_none() {
        return Ok(0);
    }

    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(version)
}
