//! Generic resilience primitives: linear backoff and a semaphore-backed
//! bulkhead. Neither knows anything about credentials or events — the
//! telemetry crate composes them around its batch writer and worker pool.

mod backoff;
mod bulkhead;

pub use backoff::{LinearBackoff, retry_with_backoff};
pub use bulkhead::{Bulkhead, BulkheadPermit};
