//! Planet rows, keyed by the server's body id.
//!
//! A planet belongs to the scan that last saw it. Its `moon_id` is written as
//! NULL on every upsert and set again by [`link_moon`] when the same slot of
//! the same sector also holds a moon.

use crate::error::{DatabaseError, Result};
use orbit_core::Capabilities;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};

/// A populated planet slot, as parsed from a sector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetRecord {
    /// Body id
    pub planet_id: i64,
    /// Display name
    pub name: Option<String>,
    /// Owning player id
    pub player_id: Option<i64>,
    /// Image name, see [`crate::images`]
    pub image: Option<String>,
    /// Destroyed planets keep their slot until cleared
    pub is_destroyed: bool,
    /// Minutes since last activity, if shown
    pub activity: Option<i64>,
    /// Slot within the sector (1-16)
    pub position: i64,
    /// Mission capability flags (`can_destroy` is not stored for planets)
    pub capabilities: Capabilities,
}

/// A planet row as stored, including its scan and moon links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlanet {
    /// Parsed planet data
    pub planet: PlanetRecord,
    /// Scan that last saw the planet
    pub scan_id: i64,
    /// Moon in the same slot, if any
    pub moon_id: Option<i64>,
}

/// Insert or overwrite a planet row under `scan_id`, clearing its moon link.
///
/// # Errors
/// Returns `DatabaseError::InvalidRecord` for a position outside 1-16.
pub async fn upsert_planet<'e, E>(executor: E, scan_id: i64, planet: &PlanetRecord) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    if !(1..=16).contains(&planet.position) {
        return Err(DatabaseError::InvalidRecord(format!(
            "planet {} at position {}",
            planet.planet_id, planet.position
        )));
    }

    let caps = &planet.capabilities;
    sqlx::query(
        "INSERT INTO planets (planet_id, name, player_id, image, is_destroyed, activity,
                              scan_id, position, moon_id,
                              can_attack, can_transport, can_deploy, can_hold, can_espionage)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, ?)
         ON CONFLICT(planet_id) DO UPDATE SET
             name = excluded.name,
             player_id = excluded.player_id,
             image = excluded.image,
             is_destroyed = excluded.is_destroyed,
             activity = excluded.activity,
             scan_id = excluded.scan_id,
             position = excluded.position,
             moon_id = NULL,
             can_attack = excluded.can_attack,
             can_transport = excluded.can_transport,
             can_deploy = excluded.can_deploy,
             can_hold = excluded.can_hold,
             can_espionage = excluded.can_espionage",
    )
    .bind(planet.planet_id)
    .bind(&planet.name)
    .bind(planet.player_id)
    .bind(&planet.image)
    .bind(planet.is_destroyed)
    .bind(planet.activity)
    .bind(scan_id)
    .bind(planet.position)
    .bind(caps.can_attack)
    .bind(caps.can_transport)
    .bind(caps.can_deploy)
    .bind(caps.can_hold)
    .bind(caps.can_espionage)
    .execute(executor)
    .await?;

    Ok(())
}

/// Point a planet at the moon sharing its slot.
///
/// # Errors
/// Returns `DatabaseError::NotFoundWithMessage` if the planet row is missing.
pub async fn link_moon<'e, E>(executor: E, planet_id: i64, moon_id: i64) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE planets SET moon_id = ? WHERE planet_id = ?")
        .bind(moon_id)
        .bind(planet_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Planet '{planet_id}' not found"
        )));
    }

    Ok(())
}

/// Get a planet by id.
pub async fn get_planet<'e, E>(executor: E, planet_id: i64) -> Result<Option<StoredPlanet>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT planet_id, name, player_id, image, is_destroyed, activity, scan_id, position,
                moon_id, can_attack, can_transport, can_deploy, can_hold, can_espionage
         FROM planets WHERE planet_id = ?",
    )
    .bind(planet_id)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(planet_from_row).transpose()
}

/// All planets last seen by a scan, ordered by position.
pub async fn get_by_scan<'e, E>(executor: E, scan_id: i64) -> Result<Vec<StoredPlanet>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        "SELECT planet_id, name, player_id, image, is_destroyed, activity, scan_id, position,
                moon_id, can_attack, can_transport, can_deploy, can_hold, can_espionage
         FROM planets WHERE scan_id = ? ORDER BY position, planet_id",
    )
    .bind(scan_id)
    .fetch_all(executor)
    .await?;

    rows.iter().map(planet_from_row).collect()
}

fn planet_from_row(r: &SqliteRow) -> Result<StoredPlanet> {
    Ok(StoredPlanet {
        planet: PlanetRecord {
            planet_id: r.try_get("planet_id")?,
            name: r.try_get("name")?,
            player_id: r.try_get("player_id")?,
            image: r.try_get("image")?,
            is_destroyed: r.try_get("is_destroyed")?,
            activity: r.try_get("activity")?,
            position: r.try_get("position")?,
            capabilities: Capabilities {
                can_attack: r.try_get("can_attack")?,
                can_transport: r.try_get("can_transport")?,
                can_deploy: r.try_get("can_deploy")?,
                can_hold: r.try_get("can_hold")?,
                can_espionage: r.try_get("can_espionage")?,
                can_destroy: false,
            },
        },
        scan_id: r.try_get("scan_id")?,
        moon_id: r.try_get("moon_id")?,
    })
}
