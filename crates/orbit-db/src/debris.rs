//! Debris field rows, keyed by `(scan_id, position)`.

use crate::error::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor};

/// Recoverable resources at a slot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
pub struct DebrisRecord {
    /// Slot within the sector (1-16)
    pub position: i64,
    /// Metal amount
    pub metal: i64,
    /// Crystal amount
    pub crystal: i64,
    /// Deuterium amount
    pub deuterium: i64,
    /// Recyclers needed to harvest the field
    pub required_ships: Option<i64>,
}

/// Insert or overwrite the debris field at `(scan_id, position)`.
///
/// # Errors
/// Returns `DatabaseError::InvalidRecord` for negative amounts or a position outside 1-16.
pub async fn upsert_debris<'e, E>(executor: E, scan_id: i64, debris: &DebrisRecord) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    if debris.metal < 0 || debris.crystal < 0 || debris.deuterium < 0 {
        return Err(DatabaseError::InvalidRecord(format!(
            "negative debris amount at position {}",
            debris.position
        )));
    }
    if !(1..=16).contains(&debris.position) {
        return Err(DatabaseError::InvalidRecord(format!(
            "debris at position {}",
            debris.position
        )));
    }

    sqlx::query(
        "INSERT INTO debris (scan_id, position, metal, crystal, deuterium, required_ships)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(scan_id, position) DO UPDATE SET
             metal = excluded.metal,
             crystal = excluded.crystal,
             deuterium = excluded.deuterium,
             required_ships = excluded.required_ships",
    )
    .bind(scan_id)
    .bind(debris.position)
    .bind(debris.metal)
    .bind(debris.crystal)
    .bind(debris.deuterium)
    .bind(debris.required_ships)
    .execute(executor)
    .await?;

    Ok(())
}

/// All debris fields of a scan, ordered by position.
pub async fn get_by_scan<'e, E>(executor: E, scan_id: i64) -> Result<Vec<DebrisRecord>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, DebrisRecord>(
        "SELECT position, metal, crystal, deuterium, required_ships
         FROM debris WHERE scan_id = ? ORDER BY position",
    )
    .bind(scan_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
