//! Orbit Core - Foundation crate for the Orbit sector scanner.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other Orbit crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Coordinate newtypes (`Galaxy`, `SystemRange`, `Coordinate`)
//! - [`capabilities`] - Mission types and the capability flags derived from them
//!
//! # Example
//!
//! ```rust
//! use orbit_core::{AppConfig, Galaxy, SystemRange};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let galaxy = Galaxy::new(3, config.scanning.max_galaxy)?;
//! let systems: SystemRange = "10-20".parse()?;
//! assert_eq!(systems.len(), 11);
//! # let _ = galaxy;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use capabilities::{Capabilities, MissionType};
pub use config::{AppConfig, DatabaseConfig, ScanningConfig, ServerConfig};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use types::{Coordinate, Galaxy, SystemRange, MAX_SYSTEM, NO_PLAYER_ID};
