//! Proxy module for parsing and probing proxies
//!
//! This module provides functionality for:
//! - Parsing proxy lists (IP:PORT, USER:PASS@IP:PORT, protocol://...)
//! - Probing proxies through a bounded-concurrency batch runner
//! - Aggregating results into summary statistics
//! - Exporting results as text, CSV or JSON reports

pub mod batch;
pub mod checker;
pub mod error;
pub mod export;
pub mod limiter;
pub mod models;
pub mod parser;
pub mod stats;

pub use batch::{run_batch, BatchProgress, BatchRunner};
pub use checker::{normalize_test_url, CheckerConfig, Probe, ProxyChecker};
pub use error::BatchError;
pub use export::{export_to_file, parse_csv, ExportFormat};
pub use limiter::{ConcurrencyLimiter, ProbeSlot};
pub use models::{ProbeResult, ProbeStatus, ProxyEntry, ProxyProtocol};
pub use parser::ProxyParser;
pub use stats::{aggregate, Statistics};
