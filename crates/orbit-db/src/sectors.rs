//! Whole-sector writes.
//!
//! A sector is persisted in one transaction so concurrent workers never see
//! (or leave behind) a half-written sector. The scan upsert runs first: it is
//! a write, so the transaction takes the `SQLite` write lock immediately and
//! the busy timeout applies instead of a mid-transaction upgrade failure.

use crate::debris::{self, DebrisRecord};
use crate::error::Result;
use crate::images::{self, ImageRecord};
use crate::moons::{self, MoonRecord};
use crate::planets::{self, PlanetRecord};
use crate::players::{self, PlayerRecord};
use crate::scans;
use orbit_core::Coordinate;
use sqlx::{Pool, Sqlite};

/// A moon together with the slot it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedMoon {
    /// Slot within the sector (1-16)
    pub position: i64,
    /// Moon data
    pub moon: MoonRecord,
}

/// Everything extracted from one successfully parsed sector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorWrite {
    /// Owners seen in the sector (sentinel ids are skipped on write)
    pub players: Vec<PlayerRecord>,
    /// Image references
    pub images: Vec<ImageRecord>,
    /// Planets
    pub planets: Vec<PlanetRecord>,
    /// Moons with their slots
    pub moons: Vec<PlacedMoon>,
    /// Debris fields
    pub debris: Vec<DebrisRecord>,
}

impl SectorWrite {
    /// Number of entity rows the write carries.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.players.len()
            + self.images.len()
            + self.planets.len()
            + self.moons.len()
            + self.debris.len()
    }
}

/// Persist a parsed sector atomically and return its scan id.
///
/// Order inside the transaction: scan row (success), players, images,
/// planets, moons, debris, then one pass linking each planet to the moon
/// in the same slot. Any error rolls the whole sector back.
pub async fn write_sector(
    pool: &Pool<Sqlite>,
    coordinate: Coordinate,
    sector: &SectorWrite,
) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let scan_id = scans::record_scan(&mut *tx, coordinate, true).await?;

    for player in &sector.players {
        players::upsert_player(&mut *tx, player).await?;
    }
    for image in &sector.images {
        images::ensure_image(&mut *tx, image).await?;
    }
    for planet in &sector.planets {
        planets::upsert_planet(&mut *tx, scan_id, planet).await?;
    }
    for placed in &sector.moons {
        moons::upsert_moon(&mut *tx, &placed.moon).await?;
    }
    for field in &sector.debris {
        debris::upsert_debris(&mut *tx, scan_id, field).await?;
    }

    let mut links = 0usize;
    for planet in &sector.planets {
        if let Some(placed) = sector.moons.iter().find(|m| m.position == planet.position) {
            planets::link_moon(&mut *tx, planet.planet_id, placed.moon.moon_id).await?;
            links += 1;
        }
    }

    tx.commit().await?;

    tracing::debug!(
        "Stored sector {} as scan {} ({} entities, {} moon links)",
        coordinate,
        scan_id,
        sector.entity_count(),
        links
    );

    Ok(scan_id)
}

/// Record a sector whose fetch or parse gave up, marking it for a later re-scan.
pub async fn record_failed_scan(pool: &Pool<Sqlite>, coordinate: Coordinate) -> Result<i64> {
    let scan_id = scans::record_scan(pool, coordinate, false).await?;
    tracing::debug!("Recorded failed scan {} for sector {}", scan_id, coordinate);
    Ok(scan_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use orbit_core::Capabilities;

    async fn setup_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    fn player(id: i64) -> PlayerRecord {
        PlayerRecord {
            player_id: id,
            name: Some(format!("player-{id}")),
            is_active: true,
            ..PlayerRecord::default()
        }
    }

    fn planet(id: i64, owner: i64, position: i64) -> PlanetRecord {
        PlanetRecord {
            planet_id: id,
            name: Some("Colony".to_string()),
            player_id: Some(owner),
            image: Some("planet_gas_1".to_string()),
            is_destroyed: false,
            activity: Some(0),
            position,
            capabilities: Capabilities::from_mission_ids([1, 3, 6]),
        }
    }

    fn placed_moon(id: i64, position: i64) -> PlacedMoon {
        PlacedMoon {
            position,
            moon: MoonRecord {
                moon_id: id,
                name: Some("Moon".to_string()),
                size: Some(5000),
                image: None,
                is_destroyed: false,
                activity: None,
                capabilities: Capabilities::from_mission_ids([9]),
            },
        }
    }

    fn full_sector() -> SectorWrite {
        SectorWrite {
            players: vec![player(1), player(2)],
            images: vec![ImageRecord {
                image_name: "planet_gas_1".to_string(),
                image_src: "https://cdn.example.test/gas.png".to_string(),
            }],
            planets: vec![planet(10, 1, 4), planet(11, 2, 7)],
            moons: vec![placed_moon(20, 4)],
            debris: vec![DebrisRecord {
                position: 7,
                metal: 3000,
                crystal: 1200,
                deuterium: 0,
                required_ships: Some(1),
            }],
        }
    }

    #[tokio::test]
    async fn test_write_full_sector() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 2, system: 45 };

        let scan_id = write_sector(db.pool(), coordinate, &full_sector())
            .await
            .expect("write sector");

        let scan = scans::get_scan(db.pool(), coordinate)
            .await
            .expect("get scan")
            .expect("scan exists");
        assert_eq!(scan.id, scan_id);
        assert!(scan.success);

        let stored = planets::get_by_scan(db.pool(), scan_id)
            .await
            .expect("get planets");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].planet.planet_id, 10);
        assert_eq!(stored[0].moon_id, Some(20));
        assert_eq!(stored[1].moon_id, None);

        let fields = debris::get_by_scan(db.pool(), scan_id)
            .await
            .expect("get debris");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].position, 7);

        assert!(players::get_player(db.pool(), 2)
            .await
            .expect("get player")
            .is_some());
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 2, system: 45 };

        let first = write_sector(db.pool(), coordinate, &full_sector())
            .await
            .expect("first write");
        let second = write_sector(db.pool(), coordinate, &full_sector())
            .await
            .expect("second write");
        assert_eq!(first, second);

        let scan_count = scans::count_scans(db.pool()).await.expect("count scans");
        assert_eq!(scan_count, 1);

        let planet_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM planets")
            .fetch_one(db.pool())
            .await
            .expect("count planets");
        assert_eq!(planet_count, 2);

        let moon_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM moons")
            .fetch_one(db.pool())
            .await
            .expect("count moons");
        assert_eq!(moon_count, 1);
    }

    #[tokio::test]
    async fn test_moon_gone_clears_link() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 1, system: 3 };

        write_sector(db.pool(), coordinate, &full_sector())
            .await
            .expect("first write");

        let mut without_moon = full_sector();
        without_moon.moons.clear();
        write_sector(db.pool(), coordinate, &without_moon)
            .await
            .expect("second write");

        let stored = planets::get_planet(db.pool(), 10)
            .await
            .expect("get planet")
            .expect("planet exists");
        assert_eq!(stored.moon_id, None);
    }

    #[tokio::test]
    async fn test_invalid_entity_rolls_back_sector() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 4, system: 100 };

        let mut sector = full_sector();
        sector.debris[0].metal = -5;

        let result = write_sector(db.pool(), coordinate, &sector).await;
        assert!(result.is_err());

        let scan = scans::get_scan(db.pool(), coordinate)
            .await
            .expect("get scan");
        assert!(scan.is_none());
        assert!(planets::get_planet(db.pool(), 10)
            .await
            .expect("get planet")
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_scan_overwrites_success() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 1, system: 499 };

        write_sector(db.pool(), coordinate, &SectorWrite::default())
            .await
            .expect("write empty sector");
        record_failed_scan(db.pool(), coordinate)
            .await
            .expect("record failure");

        let failed = scans::list_failed(db.pool(), Some(1))
            .await
            .expect("list failed");
        assert_eq!(failed, vec![coordinate]);
    }

    #[tokio::test]
    async fn test_sentinel_owner_player_skipped() {
        let db = setup_test_db().await;
        let coordinate = Coordinate { galaxy: 1, system: 10 };

        let sector = SectorWrite {
            players: vec![player(orbit_core::NO_PLAYER_ID)],
            ..SectorWrite::default()
        };
        write_sector(db.pool(), coordinate, &sector)
            .await
            .expect("write sector");

        assert!(players::get_player(db.pool(), orbit_core::NO_PLAYER_ID)
            .await
            .expect("get player")
            .is_none());
    }
}
