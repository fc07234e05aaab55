//! Configuration management for Orbit.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/orbit/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote server settings
    pub server: ServerConfig,
    /// Scanning behavior settings
    pub scanning: ScanningConfig,
    /// Local store settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// Unlike [`AppConfig::load`], a missing file is an error.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ORBIT_SERVER_URL`: Override the server base URL
    /// - `ORBIT_PROFILE_DIR`: Override the browser profile directory
    /// - `ORBIT_WORKERS`: Override the worker count
    /// - `ORBIT_DATABASE`: Override the database path
    pub fn load_with_env(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ORBIT_SERVER_URL") {
            tracing::debug!("Override server.base_url from env: {}", val);
            self.server.base_url = val;
        }

        if let Ok(val) = std::env::var("ORBIT_PROFILE_DIR") {
            tracing::debug!("Override server.profile_dir from env: {}", val);
            self.server.profile_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("ORBIT_WORKERS") {
            if let Ok(workers) = val.parse() {
                self.scanning.workers = Some(workers);
                tracing::debug!("Override scanning.workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("ORBIT_DATABASE") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = Some(PathBuf::from(val));
        }
    }

    /// Check values that would make a scan meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.scanning.workers == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "scanning.workers".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scanning.max_galaxy == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.max_galaxy".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scanning.max_consecutive_store_failures == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanning.max_consecutive_store_failures".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/orbit/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "orbit", "orbit").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/orbit`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "orbit", "orbit").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Remote server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Game endpoint base URL, without the trailing `index.php`
    pub base_url: String,
    /// Browser profile directory handed to the credential supplier
    pub profile_dir: PathBuf,
    /// Name of the rotating session-continuity cookie
    pub session_cookie: String,
    /// Substring proving the probe page was served to a logged-in session
    pub probe_marker: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Wait between authentication attempts in seconds
    pub login_retry_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://s163-ar.ogame.gameforge.com/game".to_string(),
            profile_dir: PathBuf::from("profile_data"),
            session_cookie: "prsess_100170".to_string(),
            probe_marker: "component=galaxy".to_string(),
            request_timeout_secs: 10,
            login_retry_secs: 10,
        }
    }
}

/// Scanning behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    /// Number of concurrent workers (defaults to `min(3, cores)`)
    pub workers: Option<usize>,
    /// Highest galaxy number served by the remote server
    pub max_galaxy: u8,
    /// Backoff retries per coordinate when running a pool of workers
    pub max_retries: u32,
    /// Backoff retries per coordinate when running a single worker
    pub single_worker_max_retries: u32,
    /// Base of the exponential backoff in milliseconds
    pub backoff_base_ms: u64,
    /// Upper bound of the random pause after every request in milliseconds
    pub jitter_max_ms: u64,
    /// Re-authentications allowed per coordinate before it is marked failed
    pub max_reauthentications: u32,
    /// Consecutive sector write failures that abort the run
    pub max_consecutive_store_failures: u32,
    /// Interval between aggregate progress summaries in seconds
    pub summary_interval_secs: u64,
}

impl ScanningConfig {
    /// Worker count to use, falling back to `min(3, available cores)`.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
                .min(3)
        })
    }

    /// Backoff retry budget for the given pool size.
    #[must_use]
    pub fn retries_for(&self, workers: usize) -> u32 {
        if workers <= 1 {
            self.single_worker_max_retries
        } else {
            self.max_retries
        }
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            workers: None,
            max_galaxy: 5,
            max_retries: 3,
            single_worker_max_retries: 5,
            backoff_base_ms: 1000,
            jitter_max_ms: 1000,
            max_reauthentications: 5,
            max_consecutive_store_failures: 5,
            summary_interval_secs: 30,
        }
    }
}

/// Local store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` file (defaults to `<data dir>/galaxy.db`)
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolve the configured path, falling back to the XDG data directory.
    pub fn resolve_path(&self) -> ConfigResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(AppConfig::data_dir()?.join("galaxy.db")),
        }
    }
}
