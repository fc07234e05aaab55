//! Scan rows: one per `(galaxy, system)` ever fetched.
//!
//! A re-scan updates the existing row in place, so the table always holds
//! exactly one row per coordinate.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use orbit_core::Coordinate;
use sqlx::{Row, SqliteExecutor};

/// A record of the last fetch of one sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    /// Surrogate key referenced by planets and debris
    pub id: i64,
    /// Sector coordinate
    pub coordinate: Coordinate,
    /// When the sector was last fetched
    pub scanned_at: DateTime<Utc>,
    /// Whether the last fetch produced a parsed body
    pub success: bool,
}

/// Create or update the scan row for a coordinate and return its id.
///
/// # Errors
/// Returns `DatabaseError::Sqlx` if the upsert fails.
pub async fn record_scan<'e, E>(executor: E, coordinate: Coordinate, success: bool) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO scans (galaxy, system, scanned_at, success)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(galaxy, system) DO UPDATE SET
             scanned_at = excluded.scanned_at,
             success = excluded.success
         RETURNING id",
    )
    .bind(i64::from(coordinate.galaxy))
    .bind(i64::from(coordinate.system))
    .bind(Utc::now().to_rfc3339())
    .bind(success)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Get the scan row for a coordinate.
pub async fn get_scan<'e, E>(executor: E, coordinate: Coordinate) -> Result<Option<ScanRecord>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT id, galaxy, system, scanned_at, success FROM scans WHERE galaxy = ? AND system = ?",
    )
    .bind(i64::from(coordinate.galaxy))
    .bind(i64::from(coordinate.system))
    .fetch_optional(executor)
    .await?;

    row.map(|r| -> Result<ScanRecord> {
        let scanned_at: String = r.try_get("scanned_at")?;
        Ok(ScanRecord {
            id: r.try_get("id")?,
            coordinate: coordinate_from_row(r.try_get("galaxy")?, r.try_get("system")?)?,
            scanned_at: parse_timestamp(&scanned_at)?,
            success: r.try_get("success")?,
        })
    })
    .transpose()
}

/// Coordinates whose last fetch failed, ordered by galaxy then system.
///
/// When `galaxy` is given only that galaxy is listed.
pub async fn list_failed<'e, E>(executor: E, galaxy: Option<u8>) -> Result<Vec<Coordinate>>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT galaxy, system FROM scans
         WHERE success = 0 AND (?1 IS NULL OR galaxy = ?1)
         ORDER BY galaxy, system",
    )
    .bind(galaxy.map(i64::from))
    .fetch_all(executor)
    .await?;

    rows.into_iter()
        .map(|(g, s)| coordinate_from_row(g, s))
        .collect()
}

/// Total number of scan rows.
pub async fn count_scans<'e, E>(executor: E) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM scans")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

fn coordinate_from_row(galaxy: i64, system: i64) -> Result<Coordinate> {
    let galaxy = u8::try_from(galaxy)
        .map_err(|_| DatabaseError::InvalidRecord(format!("galaxy {galaxy} out of range")))?;
    let system = u16::try_from(system)
        .map_err(|_| DatabaseError::InvalidRecord(format!("system {system} out of range")))?;
    Ok(Coordinate { galaxy, system })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidRecord(format!("invalid scanned_at '{s}': {e}")))
}
