//! Concurrency limiter
//!
//! Caps the number of requests in flight across a batch. Slots are handed
//! out as guards and go back to the pool when the guard is dropped, whichever
//! way the holder exits.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// A held limiter slot; dropping it frees the slot
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

/// Bounded admission gate backed by a fair semaphore
///
/// Waiters are admitted in FIFO order, so a queued request is always
/// admitted once enough slots free up.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    /// Creates a limiter; a capacity of 0 is raised to 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// # Returns
    ///
    /// * `Ok(SlotGuard)` - A slot, released on drop
    /// * `Err(AcquireError)` - The limiter was closed
    pub async fn acquire(&self) -> Result<SlotGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        Ok(SlotGuard { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn in_use(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
