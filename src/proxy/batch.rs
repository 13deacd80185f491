//! Batch runner driving many probes through the concurrency limiter
//!
//! Probes are admitted in input order and complete in any order. Every
//! finished result travels over one channel to a single collector, which
//! appends it and reports progress, so the progress callback is never
//! invoked concurrently.
//!
//! Cancellation is advisory: once the token fires no further probe is
//! admitted, but probes already past the limiter run to completion and their
//! results are kept. In-flight network operations are never aborted.

use crate::proxy::checker::{CheckerConfig, Probe, ProxyChecker};
use crate::proxy::error::BatchError;
use crate::proxy::limiter::ConcurrencyLimiter;
use crate::proxy::models::{ProbeResult, ProxyEntry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Error detail recorded when a check panics instead of returning a result
pub const PANIC_DETAIL: &str = "check panicked";

/// Progress notification emitted once per completed probe
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// Results collected so far, including `result`
    pub completed: usize,
    pub total: usize,
    /// The result just appended
    pub result: &'a ProbeResult,
}

impl BatchProgress<'_> {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 / self.total as f64 * 100.0
        }
    }
}

/// Runs one probe per entry with at most `concurrency` in flight
pub struct BatchRunner<P: Probe> {
    prober: Arc<P>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl<P: Probe> BatchRunner<P> {
    pub fn new(prober: P, concurrency: usize) -> Self {
        Self {
            prober: Arc::new(prober),
            concurrency,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned stop signal
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Probe every entry and return the results in completion order.
    ///
    /// Returns [`BatchError::Cancelled`] with the completed results when the
    /// stop signal kept some entries from being admitted.
    pub async fn run<F>(
        &self,
        entries: Vec<ProxyEntry>,
        mut on_progress: F,
    ) -> Result<Vec<ProbeResult>, BatchError>
    where
        F: FnMut(BatchProgress<'_>),
    {
        let limiter = ConcurrencyLimiter::new(self.concurrency)?;
        let total = entries.len();

        tracing::info!(total, concurrency = self.concurrency, "Starting probe batch");

        let (tx, mut rx) = mpsc::unbounded_channel();

        let admit = self.admit(entries, &limiter, tx);
        let collect = async {
            let mut results = Vec::with_capacity(total);
            while let Some(result) = rx.recv().await {
                results.push(result);
                if let Some(latest) = results.last() {
                    on_progress(BatchProgress {
                        completed: results.len(),
                        total,
                        result: latest,
                    });
                }
            }
            results
        };

        let (admitted, results) = tokio::join!(admit, collect);
        let admitted = admitted?;

        if admitted < total {
            tracing::warn!(
                admitted,
                completed = results.len(),
                total,
                "Probe batch cancelled, remaining entries were not admitted"
            );
            return Err(BatchError::Cancelled { results, total });
        }

        tracing::info!(completed = results.len(), total, "Probe batch finished");
        Ok(results)
    }

    /// Admit entries in input order, one spawned probe per limiter slot.
    /// Returns how many were admitted before the stop signal.
    ///
    /// A probe that panics is reported as a failed result, so every admitted
    /// entry still yields exactly one result.
    async fn admit(
        &self,
        entries: Vec<ProxyEntry>,
        limiter: &ConcurrencyLimiter,
        tx: mpsc::UnboundedSender<ProbeResult>,
    ) -> Result<usize, BatchError> {
        let mut admitted = 0;

        for entry in entries {
            let slot = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                slot = limiter.acquire() => slot?,
            };

            let prober = Arc::clone(&self.prober);
            let tx = tx.clone();
            tokio::spawn(async move {
                let target = entry.clone();
                let check = tokio::spawn(async move { prober.probe(&target).await });
                let result = match check.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(proxy = %entry, error = %e, "Check task failed");
                        ProbeResult::failed(&entry, PANIC_DETAIL)
                    }
                };
                drop(slot);
                // The collector drains until every sender is gone
                let _ = tx.send(result);
            });
            admitted += 1;
        }

        Ok(admitted)
    }
}

/// Probe `entries` through [`ProxyChecker`] using the timeout, test URL and
/// concurrency ceiling from `config`.
pub async fn run_batch<F>(
    entries: Vec<ProxyEntry>,
    config: &CheckerConfig,
    cancel: CancellationToken,
    on_progress: F,
) -> Result<Vec<ProbeResult>, BatchError>
where
    F: FnMut(BatchProgress<'_>),
{
    if config.timeout.is_zero() {
        return Err(BatchError::InvalidTimeout);
    }

    let checker = ProxyChecker::with_config(config.clone());
    tracing::info!(
        test_url = %checker.config().test_url,
        timeout_ms = config.timeout.as_millis() as u64,
        "Probing proxies"
    );

    BatchRunner::new(checker, config.concurrency)
        .with_cancellation(cancel)
        .run(entries, on_progress)
        .await
}
