//! Run-wide counters updated by every worker.

use crate::parser::ParsedSector;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free, monotonic counters shared by the workers of one run.
#[derive(Debug, Default)]
pub struct ScanCounters {
    sectors_scanned: AtomicU64,
    sectors_failed: AtomicU64,
    planets: AtomicU64,
    moons: AtomicU64,
    debris_fields: AtomicU64,
    metal: AtomicU64,
    crystal: AtomicU64,
    deuterium: AtomicU64,
    reauthentications: AtomicU64,
    backoff_retries: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of [`ScanCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTotals {
    /// Sectors stored successfully
    pub sectors_scanned: u64,
    /// Sectors resolved as failed
    pub sectors_failed: u64,
    /// Planets stored
    pub planets: u64,
    /// Moons stored
    pub moons: u64,
    /// Debris fields stored
    pub debris_fields: u64,
    /// Metal across stored debris fields
    pub metal: u64,
    /// Crystal across stored debris fields
    pub crystal: u64,
    /// Deuterium across stored debris fields
    pub deuterium: u64,
    /// Session refreshes requested
    pub reauthentications: u64,
    /// Backoff waits taken
    pub backoff_retries: u64,
    /// Sector writes that failed
    pub store_failures: u64,
}

impl ScanTotals {
    /// Sectors resolved either way.
    #[must_use]
    pub fn sectors_done(&self) -> u64 {
        self.sectors_scanned + self.sectors_failed
    }
}

impl fmt::Display for ScanTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sectors ({} failed) | planets {} | moons {} | debris {} (M {} C {} D {}) | reauth {} | retries {}",
            self.sectors_done(),
            self.sectors_failed,
            self.planets,
            self.moons,
            self.debris_fields,
            self.metal,
            self.crystal,
            self.deuterium,
            self.reauthentications,
            self.backoff_retries
        )
    }
}

fn as_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl ScanCounters {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a stored sector and its bodies.
    pub fn record_sector(&self, sector: &ParsedSector) {
        self.sectors_scanned.fetch_add(1, Ordering::Relaxed);
        self.planets
            .fetch_add(sector.planet_count() as u64, Ordering::Relaxed);
        self.moons
            .fetch_add(sector.moon_count() as u64, Ordering::Relaxed);
        for field in sector.debris() {
            self.debris_fields.fetch_add(1, Ordering::Relaxed);
            self.metal.fetch_add(as_u64(field.metal), Ordering::Relaxed);
            self.crystal
                .fetch_add(as_u64(field.crystal), Ordering::Relaxed);
            self.deuterium
                .fetch_add(as_u64(field.deuterium), Ordering::Relaxed);
        }
    }

    /// Count a sector that was marked failed.
    pub fn record_failure(&self) {
        self.sectors_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a session refresh request.
    pub fn record_reauthentication(&self) {
        self.reauthentications.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a backoff wait.
    pub fn record_backoff(&self) {
        self.backoff_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a failed sector write.
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Read all counters.
    #[must_use]
    pub fn snapshot(&self) -> ScanTotals {
        ScanTotals {
            sectors_scanned: self.sectors_scanned.load(Ordering::Relaxed),
            sectors_failed: self.sectors_failed.load(Ordering::Relaxed),
            planets: self.planets.load(Ordering::Relaxed),
            moons: self.moons.load(Ordering::Relaxed),
            debris_fields: self.debris_fields.load(Ordering::Relaxed),
            metal: self.metal.load(Ordering::Relaxed),
            crystal: self.crystal.load(Ordering::Relaxed),
            deuterium: self.deuterium.load(Ordering::Relaxed),
            reauthentications: self.reauthentications.load(Ordering::Relaxed),
            backoff_retries: self.backoff_retries.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SlotEntry;
    use orbit_db::debris::DebrisRecord;
    use std::sync::Arc;

    #[test]
    fn test_record_sector_sums_debris() {
        let counters = ScanCounters::new();
        let sector = ParsedSector {
            entries: vec![
                SlotEntry::DebrisField(DebrisRecord {
                    position: 3,
                    metal: 100,
                    crystal: 50,
                    deuterium: 5,
                    required_ships: None,
                }),
                SlotEntry::DebrisField(DebrisRecord {
                    position: 16,
                    metal: 1,
                    ..DebrisRecord::default()
                }),
                SlotEntry::Empty(4),
            ],
            ..ParsedSector::default()
        };

        counters.record_sector(&sector);
        counters.record_failure();

        let totals = counters.snapshot();
        assert_eq!(totals.sectors_scanned, 1);
        assert_eq!(totals.sectors_failed, 1);
        assert_eq!(totals.sectors_done(), 2);
        assert_eq!(totals.debris_fields, 2);
        assert_eq!(totals.metal, 101);
        assert_eq!(totals.crystal, 50);
        assert_eq!(totals.deuterium, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let counters = Arc::new(ScanCounters::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counters = Arc::clone(&counters);
            handles.push(tokio::spawn(async move {
                for _ in 0..1000 {
                    counters.record_failure();
                    counters.record_backoff();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let totals = counters.snapshot();
        assert_eq!(totals.sectors_failed, 8000);
        assert_eq!(totals.backoff_retries, 8000);
    }

    #[test]
    fn test_display() {
        let totals = ScanTotals {
            sectors_scanned: 3,
            sectors_failed: 1,
            ..ScanTotals::default()
        };
        assert!(totals.to_string().starts_with("4 sectors (1 failed)"));
    }
}
