//! Proxy Probe - Proxy Liveness and Latency Checker
//!
//! Probes a list of proxies concurrently under a fixed ceiling, classifies
//! each outcome as success, failure or timeout, and summarizes the run.

pub mod proxy;
pub mod telemetry;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
