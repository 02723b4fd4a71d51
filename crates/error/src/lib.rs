//! Shared error taxonomy for the credential usage telemetry pipeline.
//!
//! Every error case is a closed variant rather than a string comparison,
//! so callers can match on it instead of inspecting messages. None of
//! these types are ever allowed to escape into the foreground request
//! path — the ingress/egress wrappers only ever log them.

use std::time::Duration;

/// Non-fatal submission error returned by `Tracker::track_usage`.
///
/// The caller is required to discard this error; it exists only so tests
/// can assert the overflow path was taken.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The bounded buffer was full even after the drop-oldest retry.
    #[error("credential usage buffer full, event dropped")]
    BufferFull,
}

/// Failure writing to or reading from the event store / credential
/// collections. Carries enough information for the retry loop in the
/// Tracker's batch writer to decide whether another attempt is worthwhile.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The underlying collection API rejected the write (validation,
    /// conflict, or transport failure against the store).
    #[error("store write failed: {reason}")]
    Write {
        /// Human-readable cause, as reported by the collection API.
        reason: String,
    },
    /// A read against the store failed or timed out.
    #[error("store read failed: {reason}")]
    Read {
        /// Human-readable cause, as reported by the collection API.
        reason: String,
    },
    /// The operation was cancelled because its deadline elapsed.
    #[error("store operation timed out after {elapsed:?}")]
    Timeout {
        /// How long the caller waited before giving up.
        elapsed: Duration,
    },
}

impl StoreError {
    /// Whether the batch writer's retry loop should attempt this record
    /// again. Timeouts and writes are retryable; nothing else is, since
    /// the taxonomy here has no permanent-rejection variant yet.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Timeout { .. })
    }
}

/// Errors surfaced by the Stats Aggregator. Per the design, read failures
/// are swallowed into zero-valued stats rather than returned here — only
/// write-path and input-validation failures propagate to the caller.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    /// `updateCredentialCollectionStats` was called with a credential type
    /// that has no backing collection.
    #[error("unknown credential type: {0}")]
    UnknownCredentialType(String),
    /// Writing the rolled-up summary back onto the credential record
    /// failed.
    #[error("failed to persist credential summary: {0}")]
    Store(#[from] StoreError),
}

/// Bounded-deadline failure from a graceful shutdown sequence.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShutdownError {
    /// The caller-supplied deadline elapsed before all workers finished.
    #[error("shutdown deadline of {deadline:?} exceeded with workers still in flight")]
    DeadlineExceeded {
        /// The deadline that was exceeded.
        deadline: Duration,
    },
}
