//! Summary statistics over probe results

use crate::proxy::models::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot computed from a result collection. Recompute rather than update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub success_count: usize,
    /// Everything that is not a success, timeouts included
    pub failed_count: usize,
    /// Percentage in `0.0..=100.0`
    pub success_rate: f64,
    pub avg_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total:           {}", self.total)?;
        writeln!(f, "Success:         {} ({:.2}%)", self.success_count, self.success_rate)?;
        writeln!(f, "Failed:          {}", self.failed_count)?;
        writeln!(f, "Average latency: {:.2}ms", self.avg_latency)?;
        writeln!(f, "Fastest:         {:.2}ms", self.min_latency)?;
        write!(f, "Slowest:         {:.2}ms", self.max_latency)
    }
}

/// Reduce a (possibly partial) result collection to [`Statistics`].
///
/// Latency figures only consider successful probes and are 0 when there are
/// none.
pub fn aggregate(results: &[ProbeResult]) -> Statistics {
    let total = results.len();
    let latencies: Vec<f64> = results
        .iter()
        .filter(|r| r.is_success())
        .map(|r| r.latency_ms)
        .collect();
    let success_count = latencies.len();

    let success_rate = if total > 0 {
        success_count as f64 * 100.0 / total as f64
    } else {
        0.0
    };

    let (avg_latency, min_latency, max_latency) = if latencies.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let sum: f64 = latencies.iter().sum();
        let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
        let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (sum / success_count as f64, min, max)
    };

    Statistics {
        total,
        success_count,
        failed_count: total - success_count,
        success_rate,
        avg_latency,
        min_latency,
        max_latency,
    }
}
