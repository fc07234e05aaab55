//! Scan coordinator: seeds the queue and runs the worker pool.

use crate::counters::{ScanCounters, ScanTotals};
use crate::error::{Result, ScanError};
use crate::fetcher::{HttpSectorFetcher, SectorSource};
use crate::progress::{ProgressSink, TracingProgress};
use crate::queue::CoordinateQueue;
use crate::retry::RetryPolicy;
use crate::store::SectorStore;
use crate::worker::{ScannerWorker, StoreHealth, WorkerContext};
use futures::stream::{FuturesUnordered, StreamExt};
use orbit_core::{Galaxy, ScanningConfig, SystemRange};
use orbit_session::{Authenticator, SharedSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runs a pool of [`ScannerWorker`]s over a shared coordinate queue.
pub struct ScanCoordinator {
    queue: Arc<CoordinateQueue>,
    session: Arc<SharedSession>,
    auth: Arc<dyn Authenticator>,
    source: Arc<dyn SectorSource>,
    store: Arc<dyn SectorStore>,
    progress: Arc<dyn ProgressSink>,
    counters: Arc<ScanCounters>,
    config: ScanningConfig,
}

impl ScanCoordinator {
    /// Create a coordinator that fetches over HTTP and logs progress via `tracing`.
    #[must_use]
    pub fn new(
        session: Arc<SharedSession>,
        auth: Arc<dyn Authenticator>,
        store: Arc<dyn SectorStore>,
        config: ScanningConfig,
    ) -> Self {
        Self {
            queue: Arc::new(CoordinateQueue::new()),
            session,
            auth,
            source: Arc::new(HttpSectorFetcher::new()),
            store,
            progress: Arc::new(TracingProgress),
            counters: Arc::new(ScanCounters::new()),
            config,
        }
    }

    /// Replace the sector source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn SectorSource>) -> Self {
        self.source = source;
        self
    }

    /// Replace the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Enqueue `systems` of `galaxy`.
    pub fn seed(&self, galaxy: Galaxy, systems: &SystemRange) -> usize {
        let added = self.queue.seed(galaxy, systems);
        tracing::debug!("Seeded {} coordinates in galaxy {} ({})", added, galaxy, systems);
        added
    }

    /// Enqueue every coordinate whose last scan failed.
    ///
    /// # Errors
    /// Returns `ScanError::Database` if the failed scans cannot be read.
    pub async fn seed_failed(&self, galaxy: Option<Galaxy>) -> Result<usize> {
        let failed = self
            .store
            .failed_coordinates(galaxy.map(Galaxy::get))
            .await?;
        let added = self.queue.seed_coordinates(failed);
        tracing::info!("Seeded {} previously failed coordinates", added);
        Ok(added)
    }

    /// Coordinates still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    /// Current totals.
    #[must_use]
    pub fn totals(&self) -> ScanTotals {
        self.counters.snapshot()
    }

    /// Run `worker_count` workers until the queue drains or `cancel` fires.
    ///
    /// The first worker error cancels the others and is returned once all of
    /// them have stopped.
    ///
    /// # Errors
    /// `ScanError::PersistenceFailing` when the store keeps failing,
    /// `ScanError::Session` when re-authentication gives up,
    /// `ScanError::WorkerFailed` when a worker task panics.
    pub async fn run(&self, worker_count: usize, cancel: &CancellationToken) -> Result<ScanTotals> {
        let workers = worker_count.max(1);
        let policy = RetryPolicy::from_config(&self.config, workers);
        let run_token = cancel.child_token();

        let ctx = Arc::new(WorkerContext {
            queue: Arc::clone(&self.queue),
            session: Arc::clone(&self.session),
            auth: Arc::clone(&self.auth),
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            counters: Arc::clone(&self.counters),
            progress: Arc::clone(&self.progress),
            policy,
            store_health: StoreHealth::new(self.config.max_consecutive_store_failures),
        });

        tracing::info!(
            "Scanning {} coordinates with {} workers (max {} retries)",
            self.queue.remaining(),
            workers,
            policy.max_retries
        );

        let ticker_token = run_token.child_token();
        let ticker = self.spawn_summary_ticker(ticker_token.clone());

        let mut handles: FuturesUnordered<JoinHandle<Result<usize>>> = (1..=workers)
            .map(|id| {
                let worker = ScannerWorker::new(id, Arc::clone(&ctx));
                tokio::spawn(worker.run(run_token.clone()))
            })
            .collect();

        let mut first_error: Option<ScanError> = None;
        while let Some(joined) = handles.next().await {
            let outcome = joined
                .map_err(|e| ScanError::WorkerFailed(e.to_string()))
                .and_then(|result| result);

            match outcome {
                Ok(resolved) => tracing::debug!("Worker finished, {} sectors resolved", resolved),
                Err(e) if first_error.is_none() => {
                    tracing::error!("Worker failed, stopping the run: {}", e);
                    run_token.cancel();
                    first_error = Some(e);
                }
                Err(e) => tracing::debug!("Additional worker error after stop: {}", e),
            }
        }

        ticker_token.cancel();
        if let Some(ticker) = ticker {
            let _ = ticker.await;
        }

        let totals = self.counters.snapshot();
        self.progress.summary(&totals, self.queue.remaining());

        match first_error {
            Some(e) => Err(e),
            None => Ok(totals),
        }
    }

    fn spawn_summary_ticker(&self, stop: CancellationToken) -> Option<JoinHandle<()>> {
        if self.config.summary_interval_secs == 0 {
            return None;
        }
        let period = Duration::from_secs(self.config.summary_interval_secs);
        let counters = Arc::clone(&self.counters);
        let queue = Arc::clone(&self.queue);
        let progress = Arc::clone(&self.progress);

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = interval.tick() => progress.summary(&counters.snapshot(), queue.remaining()),
                }
            }
        }))
    }
}
