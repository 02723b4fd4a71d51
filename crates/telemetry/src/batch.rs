use std::time::Duration;

use meridian_credential::{Event, EventRecord, EventStore};
use meridian_resilience::LinearBackoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::TrackerConfig;
use crate::stats::TrackerStats;

/// Every store write executes under this deadline during normal
/// operation; a shorter deadline applies during the shutdown final flush.
pub(crate) const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const SHUTDOWN_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Batch write with retry.
///
/// For up to `config.retry_attempts`, sleeps `retry_backoff × attempt`
/// (zero on the first attempt, aborting early if `cancel` fires), builds a
/// fresh [`EventRecord`] for every event in the batch — generating a new
/// primary key each pass — and saves the whole batch. The retry loop
/// retries only if at least one record failed; it does not track which
/// records already succeeded, so a retried batch may insert duplicate
/// rows for records that succeeded on an earlier pass. This is the
/// accepted at-most-once-with-retry duplication risk recorded in
/// `DESIGN.md`, not an oversight.
pub(crate) async fn write_batch_with_retry(
    batch: Vec<Event>,
    store: &dyn EventStore,
    config: &TrackerConfig,
    stats: &TrackerStats,
    cancel: &CancellationToken,
    write_timeout: Duration,
) {
    let backoff = LinearBackoff::new(config.retry_backoff);
    let mut attempt = 0u32;

    loop {
        let delay = backoff.delay_for(attempt);
        if delay > Duration::ZERO {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => {
                    debug!(attempt, batch_len = batch.len(), "batch retry aborted: cancelled during backoff sleep");
                    return;
                }
            }
        }

        let records: Vec<EventRecord> =
            batch.iter().cloned().map(EventRecord::new).collect();

        let outcome = tokio::time::timeout(write_timeout, store.save_batch(&records)).await;

        let results = match outcome {
            Ok(results) => results,
            Err(_) => {
                warn!(attempt, write_timeout = ?write_timeout, "batch write timed out");
                vec![]
            }
        };

        let failed = results.iter().filter(|r| r.is_err()).count() as u64;
        let succeeded = results.len() as u64 - failed;
        let timed_out = results.is_empty();

        if succeeded > 0 {
            stats.record_flushed(succeeded);
        }

        let any_failure = failed > 0 || timed_out;
        attempt += 1;

        if !any_failure {
            return;
        }

        if attempt >= config.retry_attempts {
            let lost = if timed_out { batch.len() as u64 } else { failed };
            stats.record_errors(lost);
            error!(
                attempts = attempt,
                lost_events = lost,
                "batch write exhausted retry attempts; events surrendered"
            );
            return;
        }

        debug!(attempt, failed, "batch write will retry after backoff");
    }
}
