//! Concurrency ceiling for in-flight probes

use crate::proxy::error::BatchError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps the number of probes in flight at a fixed ceiling.
///
/// Backed by a tokio [`Semaphore`], whose waiters queue in FIFO order, so every
/// queued probe is eventually admitted.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    ceiling: usize,
}

/// One admitted probe. The slot returns to the limiter when dropped.
#[derive(Debug)]
pub struct ProbeSlot {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(ceiling: usize) -> Result<Self, BatchError> {
        if ceiling == 0 {
            return Err(BatchError::InvalidConcurrency(ceiling));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(ceiling)),
            ceiling,
        })
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Slots currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.ceiling - self.available()
    }

    /// Wait until a slot is free and take it
    pub async fn acquire(&self) -> Result<ProbeSlot, BatchError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| BatchError::LimiterClosed)?;

        Ok(ProbeSlot { _permit: permit })
    }
}
