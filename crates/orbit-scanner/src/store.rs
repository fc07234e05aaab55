//! Persistence seam between the workers and the database.

use crate::parser::ParsedSector;
use async_trait::async_trait;
use orbit_core::Coordinate;
use orbit_db::{scans, sectors, Database, DatabaseError};

/// Where decoded sectors go.
#[async_trait]
pub trait SectorStore: Send + Sync {
    /// Write a sector and its entities atomically; returns the scan id.
    async fn store_sector(
        &self,
        coordinate: Coordinate,
        sector: &ParsedSector,
    ) -> Result<i64, DatabaseError>;

    /// Mark `coordinate` as failed.
    async fn store_failure(&self, coordinate: Coordinate) -> Result<i64, DatabaseError>;

    /// Coordinates whose latest scan failed, optionally within one galaxy.
    async fn failed_coordinates(&self, galaxy: Option<u8>)
        -> Result<Vec<Coordinate>, DatabaseError>;
}

/// [`SectorStore`] backed by the SQLite database.
#[derive(Debug, Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    /// Wrap an open, migrated database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SectorStore for DatabaseStore {
    async fn store_sector(
        &self,
        coordinate: Coordinate,
        sector: &ParsedSector,
    ) -> Result<i64, DatabaseError> {
        sectors::write_sector(self.db.pool(), coordinate, &sector.to_write()).await
    }

    async fn store_failure(&self, coordinate: Coordinate) -> Result<i64, DatabaseError> {
        sectors::record_failed_scan(self.db.pool(), coordinate).await
    }

    async fn failed_coordinates(
        &self,
        galaxy: Option<u8>,
    ) -> Result<Vec<Coordinate>, DatabaseError> {
        scans::list_failed(self.db.pool(), galaxy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use orbit_db::debris::DebrisRecord;
    use orbit_db::moons::MoonRecord;
    use orbit_db::planets::StoredPlanet;
    use orbit_db::players::PlayerRecord;
    use orbit_db::{debris, moons, planets, players, scans};

    const SECTOR: &str = r#"{"system":{"galaxyContent":[
        {"position":4,"player":{"playerId":7,"playerName":"Vega","isInactive":true},
         "planets":[{"planetId":70,"planetName":"Home","planetType":1,"imageInformation":"dry_1"}]}
    ]}}"#;

    /// Planet at slot 3, its owner's moon at slot 5, debris in deep space.
    const SPREAD_SECTOR: &str = r#"{"system":{"galaxyContent":[
        {"position":3,"player":{"playerId":42,"playerName":"Altair"},
         "planets":[{"planetType":1,"planetId":300,"planetName":"Home","playerId":42}]},
        {"position":5,"planets":[{"planetType":3,"planetId":500,"planetName":"Moon","playerId":42,"size":3500}]},
        {"position":16,"planets":[{"planetType":2,"requiredShips":4,
         "resources":{"metal":{"amount":1000},"crystal":{"amount":500},"deuterium":{"amount":0}}}]}
    ]}}"#;

    type SectorRows = (
        i64,
        bool,
        Option<PlayerRecord>,
        Vec<StoredPlanet>,
        Option<MoonRecord>,
        Vec<DebrisRecord>,
    );

    async fn sector_rows(db: &Database, c: Coordinate) -> SectorRows {
        let pool = db.pool();
        let scan = scans::get_scan(pool, c).await.unwrap().unwrap();
        (
            scan.id,
            scan.success,
            players::get_player(pool, 42).await.unwrap(),
            planets::get_by_scan(pool, scan.id).await.unwrap(),
            moons::get_moon(pool, 500).await.unwrap(),
            debris::get_by_scan(pool, scan.id).await.unwrap(),
        )
    }

    async fn store() -> (DatabaseStore, Database) {
        let db = Database::new(":memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        (DatabaseStore::new(db.clone()), db)
    }

    #[tokio::test]
    async fn test_store_sector_and_failure() {
        let (store, db) = store().await;
        let c = Coordinate {
            galaxy: 1,
            system: 10,
        };
        let sector = parser::parse(SECTOR).unwrap();

        let scan_id = store.store_sector(c, &sector).await.unwrap();
        let stored = planets::get_by_scan(db.pool(), scan_id)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].planet.position, 4);

        assert!(store.failed_coordinates(None).await.unwrap().is_empty());

        store.store_failure(c).await.unwrap();
        assert_eq!(store.failed_coordinates(Some(1)).await.unwrap(), vec![c]);
        assert!(store.failed_coordinates(Some(2)).await.unwrap().is_empty());

        let scan = scans::get_scan(db.pool(), c)
            .await
            .unwrap()
            .unwrap();
        assert!(!scan.success);
    }

    #[tokio::test]
    async fn test_bodies_in_separate_slots() {
        let (store, db) = store().await;
        let c = Coordinate {
            galaxy: 2,
            system: 30,
        };
        let sector = parser::parse(SPREAD_SECTOR).unwrap();
        assert!(sector.unknown.is_empty(), "{:?}", sector.unknown);

        store.store_sector(c, &sector).await.unwrap();

        let (scan_id, success, player, planets, moon, fields) = sector_rows(&db, c).await;
        assert!(success);
        assert_eq!(scans::count_scans(db.pool()).await.unwrap(), 1);
        assert_eq!(player.unwrap().player_id, 42);

        assert_eq!(planets.len(), 1);
        assert_eq!(planets[0].scan_id, scan_id);
        assert_eq!(planets[0].planet.position, 3);
        assert_eq!(planets[0].planet.name.as_deref(), Some("Home"));
        assert_eq!(planets[0].planet.player_id, Some(42));
        assert_eq!(planets[0].moon_id, None);

        assert_eq!(moon.unwrap().size, Some(3500));
        assert_eq!(
            fields,
            vec![DebrisRecord {
                position: 16,
                metal: 1000,
                crystal: 500,
                deuterium: 0,
                required_ships: Some(4),
            }]
        );
    }

    #[tokio::test]
    async fn test_storing_the_same_payload_twice_changes_nothing() {
        let (store, db) = store().await;
        let c = Coordinate {
            galaxy: 2,
            system: 30,
        };

        store
            .store_sector(c, &parser::parse(SPREAD_SECTOR).unwrap())
            .await
            .unwrap();
        let first = sector_rows(&db, c).await;

        store
            .store_sector(c, &parser::parse(SPREAD_SECTOR).unwrap())
            .await
            .unwrap();
        let second = sector_rows(&db, c).await;

        assert_eq!(first, second);
        assert_eq!(scans::count_scans(db.pool()).await.unwrap(), 1);
    }
}
