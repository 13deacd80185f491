//! Errors surfaced to the caller of a batch run

use crate::proxy::models::ProbeResult;
use thiserror::Error;

/// Failures of a batch as a whole. Individual probe failures never show up
/// here; they are recorded as [`ProbeResult`]s.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Concurrency ceiling below 1
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("probe timeout must be greater than zero")]
    InvalidTimeout,

    #[error("concurrency limiter closed while admitting probes")]
    LimiterClosed,

    /// The stop signal fired before every probe was admitted. `results`
    /// holds everything that completed, including probes already in flight
    /// when the signal arrived.
    #[error("batch cancelled after {} of {total} probes completed", results.len())]
    Cancelled {
        results: Vec<ProbeResult>,
        total: usize,
    },
}
