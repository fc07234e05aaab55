//! Per-coordinate retry state machine.
//!
//! ```text
//! Fetching -> ParseOK                                  (done)
//! Fetching -> Malformed/Stale -> Reauthenticating -> Fetching
//! Fetching -> Transport/Busy  -> Backoff          -> Fetching
//! Fetching -> MaxRetriesExceeded                       (coordinate failed)
//! ```
//!
//! Re-authentication never consumes a backoff slot; it has its own bound.

use crate::error::{FetchError, RetryStrategy};
use orbit_core::ScanningConfig;
use rand::Rng;
use std::time::Duration;

/// Largest exponent used for backoff; keeps the delay finite.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Retry limits and timings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Transport failures tolerated per coordinate
    pub max_retries: u32,
    /// Session refreshes tolerated per coordinate
    pub max_reauthentications: u32,
    /// Backoff after failure `n` is `backoff_base * 2^n`
    pub backoff_base: Duration,
    /// Upper bound of the random pause after each request
    pub jitter_max: Duration,
}

impl RetryPolicy {
    /// Policy for `workers` concurrent workers.
    #[must_use]
    pub fn from_config(config: &ScanningConfig, workers: usize) -> Self {
        Self {
            max_retries: config.retries_for(workers),
            max_reauthentications: config.max_reauthentications,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            jitter_max: Duration::from_millis(config.jitter_max_ms),
        }
    }

    /// Wait before retrying after transport failure number `attempt` (1-based).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.backoff_base.saturating_mul(factor)
    }

    /// Random pause in `0..=jitter_max`.
    #[must_use]
    pub fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.jitter_max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep, then fetch again
    Backoff(Duration),
    /// Refresh the session, then fetch again
    Reauthenticate,
    /// Resolve the coordinate as failed
    GiveUp,
}

/// Attempt bookkeeping for a single coordinate.
#[derive(Debug)]
pub struct RetryState {
    policy: RetryPolicy,
    transport_failures: u32,
    reauthentications: u32,
}

impl RetryState {
    /// Fresh state for a new coordinate.
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            transport_failures: 0,
            reauthentications: 0,
        }
    }

    /// Record a failed attempt and decide the next step.
    pub fn on_error(&mut self, error: &FetchError) -> RetryDecision {
        match error.retry_strategy() {
            RetryStrategy::Backoff => {
                self.transport_failures += 1;
                if self.transport_failures >= self.policy.max_retries {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Backoff(self.policy.backoff_delay(self.transport_failures))
                }
            }
            RetryStrategy::Reauthenticate => {
                self.reauthentications += 1;
                if self.reauthentications > self.policy.max_reauthentications {
                    RetryDecision::GiveUp
                } else {
                    RetryDecision::Reauthenticate
                }
            }
        }
    }

    /// Transport failures so far.
    #[must_use]
    pub fn transport_failures(&self) -> u32 {
        self.transport_failures
    }

    /// Session refreshes so far.
    #[must_use]
    pub fn reauthentications(&self) -> u32 {
        self.reauthentications
    }
}
