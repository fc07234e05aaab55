//! Moon rows, keyed by the server's body id.

use crate::error::Result;
use orbit_core::Capabilities;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteExecutor};

/// A populated moon slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoonRecord {
    /// Body id
    pub moon_id: i64,
    /// Display name
    pub name: Option<String>,
    /// Diameter in km
    pub size: Option<i64>,
    /// Image name, see [`crate::images`]
    pub image: Option<String>,
    /// Destroyed moons keep their slot until cleared
    pub is_destroyed: bool,
    /// Minutes since last activity, if shown
    pub activity: Option<i64>,
    /// Mission capability flags
    pub capabilities: Capabilities,
}

/// Insert or overwrite a moon row.
pub async fn upsert_moon<'e, E>(executor: E, moon: &MoonRecord) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let caps = &moon.capabilities;
    sqlx::query(
        "INSERT INTO moons (moon_id, name, size, image, is_destroyed, activity,
                            can_attack, can_transport, can_deploy, can_hold,
                            can_espionage, can_destroy)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(moon_id) DO UPDATE SET
             name = excluded.name,
             size = excluded.size,
             image = excluded.image,
             is_destroyed = excluded.is_destroyed,
             activity = excluded.activity,
             can_attack = excluded.can_attack,
             can_transport = excluded.can_transport,
             can_deploy = excluded.can_deploy,
             can_hold = excluded.can_hold,
             can_espionage = excluded.can_espionage,
             can_destroy = excluded.can_destroy",
    )
    .bind(moon.moon_id)
    .bind(&moon.name)
    .bind(moon.size)
    .bind(&moon.image)
    .bind(moon.is_destroyed)
    .bind(moon.activity)
    .bind(caps.can_attack)
    .bind(caps.can_transport)
    .bind(caps.can_deploy)
    .bind(caps.can_hold)
    .bind(caps.can_espionage)
    .bind(caps.can_destroy)
    .execute(executor)
    .await?;

    Ok(())
}

/// Get a moon by id.
pub async fn get_moon<'e, E>(executor: E, moon_id: i64) -> Result<Option<MoonRecord>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT moon_id, name, size, image, is_destroyed, activity,
                can_attack, can_transport, can_deploy, can_hold, can_espionage, can_destroy
         FROM moons WHERE moon_id = ?",
    )
    .bind(moon_id)
    .fetch_optional(executor)
    .await?;

    match row {
        Some(r) => Ok(Some(MoonRecord {
            moon_id: r.try_get("moon_id")?,
            name: r.try_get("name")?,
            size: r.try_get("size")?,
            image: r.try_get("image")?,
            is_destroyed: r.try_get("is_destroyed")?,
            activity: r.try_get("activity")?,
            capabilities: Capabilities {
                can_attack: r.try_get("can_attack")?,
                can_transport: r.try_get("can_transport")?,
                can_deploy: r.try_get("can_deploy")?,
                can_hold: r.try_get("can_hold")?,
                can_espionage: r.try_get("can_espionage")?,
                can_destroy: r.try_get("can_destroy")?,
            },
        })),
        None => Ok(None),
    }
}
