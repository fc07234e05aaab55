//! Orbit Scanner - Concurrent sector scanning.
//!
//! This crate drains a queue of sector coordinates with a pool of workers.
//! Each worker fetches a sector over the shared authenticated session, parses
//! it and stores it in one transaction, with robust error handling including
//! exponential backoff for transient failures and re-authentication when the
//! server stops serving sector data.
//!
//! # Features
//!
//! - Configurable worker pool over a shared FIFO of coordinates
//! - Retry with exponential backoff and jitter, bounded per coordinate
//! - Single re-authentication per stale session across all workers
//! - Lenient response parsing; undecodable slots are logged, never fatal
//! - Run-wide atomic counters with periodic summaries
//!
//! # Example
//!
//! ```rust,ignore
//! use orbit_scanner::{DatabaseStore, ScanCoordinator};
//! use std::sync::Arc;
//!
//! let coordinator = ScanCoordinator::new(
//!     Arc::new(shared_session),
//!     Arc::new(session_guard),
//!     Arc::new(DatabaseStore::new(database)),
//!     config.scanning.clone(),
//! );
//! coordinator.seed(galaxy, &systems);
//!
//! let totals = coordinator.run(3, &cancel).await?;
//! println!("{totals}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod coordinator;
pub mod counters;
#[allow(missing_docs)]
pub mod error;
pub mod fetcher;
pub mod parser;
pub mod progress;
pub mod queue;
pub mod retry;
pub mod store;
pub mod worker;

// Re-export commonly used types
pub use coordinator::ScanCoordinator;
pub use counters::{ScanCounters, ScanTotals};
pub use error::{FetchError, MalformedResponse, Result, RetryStrategy, ScanError};
pub use fetcher::{HttpSectorFetcher, SectorSource};
pub use parser::{parse, ParsedSector, SlotEntry, UnknownEntry};
pub use progress::{status_callback, ProgressSink, SectorOutcome, TracingProgress, SESSION_STATUS};
pub use queue::CoordinateQueue;
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use store::{DatabaseStore, SectorStore};
pub use worker::ScannerWorker;
