//! Command line arguments.

use clap::Parser;
use orbit_core::{CoreError, Galaxy, SystemRange};
use std::path::PathBuf;

/// Scan sectors of the remote universe into a local database.
#[derive(Debug, Parser)]
#[command(name = "orbit-scan", version)]
#[command(about = "Scan galaxy sectors into a local SQLite database")]
pub struct Cli {
    /// Galaxy to scan (1..=max_galaxy)
    #[arg(required_unless_present_any = ["all", "rescan_failed"])]
    pub galaxy: Option<u8>,

    /// Systems to scan: a single number or a range such as 3-9 (default: all)
    pub systems: Option<SystemRange>,

    /// Scan every galaxy
    #[arg(long, conflicts_with = "galaxy")]
    pub all: bool,

    /// Re-scan coordinates whose last scan failed (limited to GALAXY if given)
    #[arg(long, conflicts_with_all = ["all", "systems"])]
    pub rescan_failed: bool,

    /// Number of concurrent workers (default: min(3, cores))
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Browser profile directory holding the exported session
    #[arg(long)]
    pub profile: Option<PathBuf>,
}

/// What a run should enqueue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    /// Fresh scan of `systems` in each galaxy
    Sectors {
        /// Galaxies in ascending order
        galaxies: Vec<Galaxy>,
        /// Systems scanned in every galaxy
        systems: SystemRange,
    },
    /// Previously failed coordinates, optionally within one galaxy
    RescanFailed {
        /// Galaxy filter
        galaxy: Option<Galaxy>,
    },
}

impl Cli {
    /// Validate the coordinates against the server's galaxy count.
    pub fn plan(&self, max_galaxy: u8) -> Result<ScanPlan, CoreError> {
        let galaxy = self
            .galaxy
            .map(|g| Galaxy::new(g, max_galaxy))
            .transpose()?;

        if self.rescan_failed {
            return Ok(ScanPlan::RescanFailed { galaxy });
        }

        let galaxies = match galaxy {
            Some(galaxy) => vec![galaxy],
            None if self.all => Galaxy::all(max_galaxy).collect(),
            None => {
                return Err(CoreError::Validation(
                    "a galaxy is required unless --all is given".to_string(),
                ))
            }
        };

        Ok(ScanPlan::Sectors {
            galaxies,
            systems: self.systems.unwrap_or_default(),
        })
    }
}
