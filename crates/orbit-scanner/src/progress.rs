//! Progress reporting seam.

use crate::counters::ScanTotals;
use orbit_core::Coordinate;
use orbit_session::StatusCallback;
use std::sync::Arc;
use std::time::Duration;

/// Worker id used for status lines that do not come from a worker, such as
/// authentication waits.
pub const SESSION_STATUS: usize = 0;

/// How a sector resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorOutcome {
    /// Parsed and stored; `entities` rows written
    Stored {
        /// Entity rows in the sector write
        entities: usize,
    },
    /// Gave up and marked failed
    Failed,
    /// Fetched but the write did not go through
    StoreFailed,
}

/// Receiver of progress events. Implementations must be cheap; they are
/// called from worker tasks.
pub trait ProgressSink: Send + Sync {
    /// Free-form status line (authentication waits, backoff notices).
    fn status(&self, worker: usize, message: &str);

    /// One coordinate resolved.
    fn sector_done(
        &self,
        worker: usize,
        coordinate: Coordinate,
        outcome: SectorOutcome,
        elapsed: Duration,
    );

    /// Aggregate counters, periodically and once at the end.
    fn summary(&self, totals: &ScanTotals, remaining: usize);
}

/// Forward a session guard's status lines to `sink`.
///
/// Pass the result to `SessionGuard::on_status` so authentication waits,
/// including the ones a worker triggers mid-run, reach the same sink as the
/// rest of the run's progress.
#[must_use]
pub fn status_callback(sink: Arc<dyn ProgressSink>) -> StatusCallback {
    Arc::new(move |line: &str| sink.status(SESSION_STATUS, line))
}

/// Default sink writing everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn status(&self, worker: usize, message: &str) {
        if worker == SESSION_STATUS {
            tracing::info!("{}", message);
        } else {
            tracing::info!("[W{}] {}", worker, message);
        }
    }

    fn sector_done(
        &self,
        worker: usize,
        coordinate: Coordinate,
        outcome: SectorOutcome,
        elapsed: Duration,
    ) {
        match outcome {
            SectorOutcome::Stored { entities } => tracing::debug!(
                "[W{}] {} stored {} entities in {:.2}s",
                worker,
                coordinate,
                entities,
                elapsed.as_secs_f64()
            ),
            SectorOutcome::Failed => tracing::warn!(
                "[W{}] {} marked failed after {:.2}s",
                worker,
                coordinate,
                elapsed.as_secs_f64()
            ),
            SectorOutcome::StoreFailed => tracing::error!(
                "[W{}] {} could not be stored ({:.2}s)",
                worker,
                coordinate,
                elapsed.as_secs_f64()
            ),
        }
    }

    fn summary(&self, totals: &ScanTotals, remaining: usize) {
        tracing::info!("{} | {} remaining", totals, remaining);
    }
}
