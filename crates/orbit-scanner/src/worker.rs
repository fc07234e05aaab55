//! A single scanning worker.
//!
//! Workers pull coordinates from the shared queue until it drains or the run
//! is cancelled. Each coordinate is fetched, parsed and stored, going through
//! the [`RetryState`] machine on failure; it always ends in exactly one scan
//! row, success or failure.

use crate::counters::ScanCounters;
use crate::error::{FetchError, Result, ScanError};
use crate::fetcher::SectorSource;
use crate::parser::{self, ParsedSector};
use crate::progress::{ProgressSink, SectorOutcome};
use crate::queue::CoordinateQueue;
use crate::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::store::SectorStore;
use orbit_core::Coordinate;
use orbit_db::DatabaseError;
use orbit_session::{Authenticator, SessionError, SharedSession};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Consecutive sector-write failures across the whole pool.
///
/// Row-level failures stop the run once the streak reaches `threshold`;
/// connection-class failures stop it at once.
#[derive(Debug)]
pub(crate) struct StoreHealth {
    consecutive_failures: AtomicU32,
    threshold: u32,
}

impl StoreHealth {
    pub(crate) fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: AtomicU32::new(0),
            threshold: threshold.max(1),
        }
    }

    fn succeeded(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
    }

    /// Returns the new streak length.
    fn failed(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_fatal(&self, streak: u32, error: &DatabaseError) -> bool {
        error.is_connection_issue() || streak >= self.threshold
    }
}

/// Everything the workers of one run share.
pub(crate) struct WorkerContext {
    pub(crate) queue: Arc<CoordinateQueue>,
    pub(crate) session: Arc<SharedSession>,
    pub(crate) auth: Arc<dyn Authenticator>,
    pub(crate) source: Arc<dyn SectorSource>,
    pub(crate) store: Arc<dyn SectorStore>,
    pub(crate) counters: Arc<ScanCounters>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) policy: RetryPolicy,
    pub(crate) store_health: StoreHealth,
}

/// One worker of the pool.
pub struct ScannerWorker {
    id: usize,
    ctx: Arc<WorkerContext>,
}

/// Sleep unless cancelled first; returns `false` on cancellation.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

impl ScannerWorker {
    pub(crate) fn new(id: usize, ctx: Arc<WorkerContext>) -> Self {
        Self { id, ctx }
    }

    /// Drain the queue. Returns the number of coordinates resolved.
    ///
    /// # Errors
    /// Returns `ScanError::PersistenceFailing` once the store keeps failing or
    /// loses its connection,
    /// or `ScanError::Session` when re-authentication gives up.
    pub async fn run(self, cancel: CancellationToken) -> Result<usize> {
        tracing::debug!("[W{}] started", self.id);
        let mut resolved = 0usize;

        loop {
            if cancel.is_cancelled() {
                tracing::debug!("[W{}] cancelled after {} sectors", self.id, resolved);
                break;
            }
            let Some(coordinate) = self.ctx.queue.pop() else {
                tracing::debug!("[W{}] queue drained after {} sectors", self.id, resolved);
                break;
            };

            let started = Instant::now();
            match self.scan_one(coordinate, &cancel).await? {
                Some(outcome) => {
                    resolved += 1;
                    self.ctx
                        .progress
                        .sector_done(self.id, coordinate, outcome, started.elapsed());
                }
                None => break,
            }
        }

        Ok(resolved)
    }

    /// Resolve one coordinate; `None` when cancelled mid-way.
    async fn scan_one(
        &self,
        coordinate: Coordinate,
        cancel: &CancellationToken,
    ) -> Result<Option<SectorOutcome>> {
        let mut state = RetryState::new(self.ctx.policy);

        loop {
            let snapshot = self.ctx.session.snapshot();

            let fetched = tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                fetched = self.ctx.source.fetch(&snapshot.session, coordinate) => fetched,
            };
            let attempt = fetched.and_then(|body| parser::parse(&body).map_err(FetchError::from));

            if !pause(cancel, self.ctx.policy.jitter()).await {
                return Ok(None);
            }

            let error = match attempt {
                Ok(sector) => return self.persist(coordinate, &sector).await.map(Some),
                Err(error) => error,
            };

            match state.on_error(&error) {
                RetryDecision::Backoff(delay) => {
                    self.ctx.counters.record_backoff();
                    tracing::warn!(
                        "[W{}] {} failed (attempt {}/{}): {}, retrying in {:?}...",
                        self.id,
                        coordinate,
                        state.transport_failures(),
                        self.ctx.policy.max_retries,
                        error,
                        delay
                    );
                    if !pause(cancel, delay).await {
                        return Ok(None);
                    }
                }
                RetryDecision::Reauthenticate => {
                    self.ctx.counters.record_reauthentication();
                    self.ctx.progress.status(
                        self.id,
                        &format!("{coordinate}: {error}, re-authenticating"),
                    );
                    match self
                        .ctx
                        .session
                        .refresh(self.ctx.auth.as_ref(), snapshot.generation, cancel)
                        .await
                    {
                        Ok(_) => {}
                        Err(SessionError::Cancelled) => return Ok(None),
                        Err(e) => return Err(ScanError::Session(e)),
                    }
                }
                RetryDecision::GiveUp => {
                    tracing::warn!(
                        "[W{}] giving up on {} after {} transport failures and {} re-authentications: {}",
                        self.id,
                        coordinate,
                        state.transport_failures(),
                        state.reauthentications(),
                        error
                    );
                    return self.mark_failed(coordinate).await.map(Some);
                }
            }
        }
    }

    async fn persist(&self, coordinate: Coordinate, sector: &ParsedSector) -> Result<SectorOutcome> {
        match self.ctx.store.store_sector(coordinate, sector).await {
            Ok(scan_id) => {
                self.ctx.store_health.succeeded();
                self.ctx.counters.record_sector(sector);
                tracing::trace!("[W{}] {} stored as scan {}", self.id, coordinate, scan_id);
                Ok(SectorOutcome::Stored {
                    entities: sector.to_write().entity_count(),
                })
            }
            Err(e) => {
                self.ctx.counters.record_store_failure();
                let failures = self.ctx.store_health.failed();
                tracing::error!(
                    "[W{}] failed to store {} ({} consecutive): {}",
                    self.id,
                    coordinate,
                    failures,
                    e
                );
                self.ctx.counters.record_failure();

                if e.is_connection_issue() {
                    return Err(Self::persistence_failing(failures, coordinate, &e));
                }
                if let Err(mark) = self.ctx.store.store_failure(coordinate).await {
                    tracing::error!("[W{}] could not mark {} failed: {}", self.id, coordinate, mark);
                }

                if self.ctx.store_health.is_fatal(failures, &e) {
                    return Err(Self::persistence_failing(failures, coordinate, &e));
                }
                Ok(SectorOutcome::StoreFailed)
            }
        }
    }

    async fn mark_failed(&self, coordinate: Coordinate) -> Result<SectorOutcome> {
        self.ctx.counters.record_failure();
        match self.ctx.store.store_failure(coordinate).await {
            Ok(_) => {
                self.ctx.store_health.succeeded();
                Ok(SectorOutcome::Failed)
            }
            Err(e) => {
                self.ctx.counters.record_store_failure();
                let failures = self.ctx.store_health.failed();
                tracing::error!(
                    "[W{}] could not mark {} failed ({} consecutive): {}",
                    self.id,
                    coordinate,
                    failures,
                    e
                );
                if self.ctx.store_health.is_fatal(failures, &e) {
                    return Err(Self::persistence_failing(failures, coordinate, &e));
                }
                Ok(SectorOutcome::StoreFailed)
            }
        }
    }

    fn persistence_failing(failures: u32, coordinate: Coordinate, e: &DatabaseError) -> ScanError {
        ScanError::PersistenceFailing {
            failures,
            coordinate,
            message: e.to_string(),
        }
    }
}
