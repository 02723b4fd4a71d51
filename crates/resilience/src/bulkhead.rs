use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, SemaphorePermit};

/// Caps concurrent execution of some operation at `max_concurrency`. Used
/// by the Tracker's dispatcher to bound the number of in-flight batch
/// writers regardless of how many batches are ready to ship.
#[derive(Clone)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
}

impl Bulkhead {
    #[must_use]
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    /// Number of workers that can be spawned right now without waiting.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire a permit, waiting if the pool is saturated. The permit is
    /// released automatically when dropped (typically at the end of a
    /// spawned worker task).
    ///
    /// # Panics
    ///
    /// Panics if the underlying semaphore was closed, which this type
    /// never does.
    pub async fn acquire(&self) -> BulkheadPermit<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("bulkhead semaphore is never closed");
        BulkheadPermit { _permit: permit }
    }

    /// Acquire a permit without waiting, or return `None` if the pool is
    /// saturated. Used by the dispatcher when it would rather drop a
    /// batch's dispatch this cycle than block on the flush tick.
    #[must_use]
    pub fn try_acquire(&self) -> Option<BulkheadPermit<'_>> {
        self.semaphore
            .try_acquire()
            .ok()
            .map(|permit| BulkheadPermit { _permit: permit })
    }

    /// Acquire a permit that owns its reference to the semaphore, so it
    /// can be moved into a spawned task rather than borrowing from this
    /// `Bulkhead`. Used when the dispatcher spawns a batch writer that
    /// must outlive the dispatch call itself.
    ///
    /// # Panics
    ///
    /// Panics if the underlying semaphore was closed, which this type
    /// never does.
    pub async fn acquire_owned(&self) -> OwnedSemaphorePermit {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("bulkhead semaphore is never closed")
    }
}

/// RAII guard for one bulkhead slot.
pub struct BulkheadPermit<'a> {
    _permit: SemaphorePermit<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caps_concurrency() {
        let bulkhead = Bulkhead::new(2);
        let _a = bulkhead.acquire().await;
        let _b = bulkhead.acquire().await;
        assert!(bulkhead.try_acquire().is_none());
        drop(_a);
        assert!(bulkhead.try_acquire().is_some());
    }

    #[tokio::test]
    async fn owned_permit_can_outlive_the_bulkhead_reference() {
        let bulkhead = Bulkhead::new(1);
        let permit = bulkhead.acquire_owned().await;
        let moved = tokio::spawn(async move {
            let _permit = permit;
        });
        moved.await.unwrap();
        assert!(bulkhead.try_acquire().is_some());
    }
}
