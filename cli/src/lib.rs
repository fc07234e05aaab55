//! Orbit command line shell.
//!
//! Thin layer that turns arguments and configuration into a scan run.
//! Scanning logic lives in the `crates/` directory.

pub mod args;

use anyhow::Context;
use orbit_core::AppConfig;
use orbit_db::Database;
use orbit_scanner::{
    status_callback, DatabaseStore, ProgressSink, ScanCoordinator, ScanTotals, TracingProgress,
};
use orbit_session::{CookieFileSupplier, ServerEndpoint, SessionGuard, SharedSession};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use args::{Cli, ScanPlan};

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,orbit=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Apply command line overrides on top of the loaded configuration.
pub fn apply_overrides(cli: &Cli, config: &mut AppConfig) {
    if let Some(workers) = cli.workers {
        config.scanning.workers = Some(usize::from(workers));
    }
    if let Some(database) = &cli.database {
        config.database.path = Some(database.clone());
    }
    if let Some(profile) = &cli.profile {
        config.server.profile_dir = profile.clone();
    }
}

/// Authenticate, seed the queue according to `plan` and scan until done or
/// cancelled.
///
/// # Errors
/// Fails when the database cannot be opened, authentication is cancelled, or
/// the scan run stops on a fatal error.
pub async fn execute(
    config: &AppConfig,
    plan: &ScanPlan,
    cancel: &CancellationToken,
) -> anyhow::Result<ScanTotals> {
    let db_path = config
        .database
        .resolve_path()
        .context("cannot determine database path")?;
    info!("Database: {}", db_path.display());

    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("cannot open database {}", db_path.display()))?;
    db.run_migrations().await.context("database migration failed")?;

    let endpoint = ServerEndpoint::new(&config.server.base_url)?;
    let supplier = Arc::new(CookieFileSupplier::new(endpoint.host()));
    let progress: Arc<dyn ProgressSink> = Arc::new(TracingProgress);
    let guard = SessionGuard::new(supplier, config.server.clone())
        .on_status(status_callback(Arc::clone(&progress)));

    info!("Waiting for an authenticated session at {}", endpoint.origin());
    let session = guard.ensure_authenticated(cancel).await?;

    let coordinator = ScanCoordinator::new(
        Arc::new(SharedSession::new(session)),
        Arc::new(guard),
        Arc::new(DatabaseStore::new(db.clone())),
        config.scanning.clone(),
    )
    .with_progress(progress);

    let seeded = match plan {
        ScanPlan::Sectors { galaxies, systems } => galaxies
            .iter()
            .map(|galaxy| coordinator.seed(*galaxy, systems))
            .sum::<usize>(),
        ScanPlan::RescanFailed { galaxy } => coordinator.seed_failed(*galaxy).await?,
    };

    if seeded == 0 {
        info!("Nothing to scan");
        db.close().await;
        return Ok(ScanTotals::default());
    }

    let workers = config.scanning.effective_workers();
    let result = coordinator.run(workers, cancel).await;
    db.close().await;

    Ok(result?)
}
