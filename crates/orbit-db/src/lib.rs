//! Orbit Database Layer
//!
//! Provides `SQLite` storage for scanned sectors. Uses `SQLx` with embedded
//! migrations and a pool sized for several concurrent scan workers.
//!
//! # Architecture
//!
//! - **Migrations**: SQL migrations are embedded and versioned using `SQLx`
//! - **Connection Pooling**: WAL journal and a busy timeout on disk, a single
//!   pinned connection for `:memory:`
//! - **Entity modules**: one module per table, every function generic over
//!   `SqliteExecutor` so it runs against the pool or inside a transaction
//! - **Sector writes**: [`sectors::write_sector`] stores a whole sector atomically
//!
//! # Example
//!
//! ```ignore
//! use orbit_db::Database;
//!
//! let db = Database::new("galaxy.db").await?;
//! db.run_migrations().await?;
//! let failed = orbit_db::scans::list_failed(db.pool(), Some(1)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod debris;
pub mod error;
pub mod images;
pub mod migrations;
/// Static mission catalogue.
pub mod missions;
pub mod moons;
pub mod planets;
/// Player rows keyed by the server's player id.
pub mod players;
pub mod scans;
pub mod sectors;

// Re-export commonly used types
pub use connection::StorePool;
pub use error::{DatabaseError, Result};
pub use sectors::{PlacedMoon, SectorWrite};

use std::path::Path;

/// High-level database interface with migrations.
///
/// Thin wrapper around [`StorePool`]; cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: StorePool,
}

impl Database {
    /// Open (or create) the database at `path`, or `:memory:`.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let db = Database::new(":memory:").await.expect("create database");
        db.ping().await.expect("ping database");
    }

    #[tokio::test]
    async fn test_database_migrations() {
        let db = Database::new(":memory:").await.expect("create database");

        db.run_migrations().await.expect("run migrations");

        let version = db.get_schema_version().await.expect("get schema version");
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("galaxy.db");

        let db = Database::new(&path).await.expect("create database");
        db.run_migrations().await.expect("run migrations");
        scans::record_scan(
            db.pool(),
            orbit_core::Coordinate {
                galaxy: 1,
                system: 2,
            },
            false,
        )
        .await
        .expect("record scan");
        db.close().await;

        let reopened = Database::new(&path).await.expect("reopen database");
        reopened.run_migrations().await.expect("re-run migrations");
        let count = scans::count_scans(reopened.pool())
            .await
            .expect("count scans");
        assert_eq!(count, 1);
    }
}
