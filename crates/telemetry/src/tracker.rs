use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use meridian_credential::{Event, EventStore};
use meridian_error::{ShutdownError, TrackerError};
use meridian_resilience::Bulkhead;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::batch::{write_batch_with_retry, SHUTDOWN_WRITE_TIMEOUT, WRITE_TIMEOUT};
use crate::buffer::Buffer;
use crate::config::TrackerConfig;
use crate::stats::{TrackerStats, TrackerStatsSnapshot};

/// The Tracker Core: a bounded buffer, a single dispatcher task, and a
/// bulkhead-capped pool of batch writers. Construct with [`Tracker::spawn`]
/// and call [`Tracker::shutdown`] once before the process exits so the
/// final flush runs.
pub struct Tracker {
    buffer: Arc<Buffer>,
    stats: Arc<TrackerStats>,
    cancel: CancellationToken,
    dispatcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Tracker {
    /// Start the dispatcher task and return a handle to it. `store` backs
    /// every batch write the dispatcher performs.
    #[must_use]
    pub fn spawn(config: TrackerConfig, store: Arc<dyn EventStore>) -> Self {
        let buffer = Arc::new(Buffer::new(config.buffer_size));
        let stats = Arc::new(TrackerStats::default());
        let cancel = CancellationToken::new();
        let bulkhead = Bulkhead::new(config.worker_pool_size);

        let dispatcher = tokio::spawn(dispatcher_loop(
            buffer.clone(),
            stats.clone(),
            config,
            store,
            cancel.clone(),
            bulkhead,
        ));

        Self { buffer, stats, cancel, dispatcher: Mutex::new(Some(dispatcher)) }
    }

    /// Submit one event for eventual persistence. Fire-and-forget from the
    /// caller's perspective: never blocks longer than the submission grace
    /// period and never returns a fatal error. Callers are required to
    /// discard the error, which exists only so tests can observe the
    /// overflow path.
    pub async fn track_usage(&self, event: Event) -> Result<(), TrackerError> {
        self.buffer.submit(event, &self.stats).await
    }

    /// Lock-free snapshot of the four counters. Safe to call concurrently
    /// with submission and flushing.
    #[must_use]
    pub fn get_stats(&self) -> TrackerStatsSnapshot {
        self.stats.snapshot()
    }

    /// Cancel the dispatcher, wait for the final flush and every in-flight
    /// worker to finish, bounded by `deadline`. Returns
    /// [`ShutdownError::DeadlineExceeded`] only if that deadline elapses;
    /// any workers still running at that point are abandoned.
    ///
    /// Calling this more than once is a no-op after the first call.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), ShutdownError> {
        self.cancel.cancel();
        let handle = self.dispatcher.lock().take();
        let Some(handle) = handle else {
            return Ok(());
        };

        match tokio::time::timeout(deadline, handle).await {
            Ok(join_result) => {
                if join_result.is_err() {
                    debug!("dispatcher task panicked during shutdown");
                }
                info!("tracker shutdown complete");
                Ok(())
            }
            Err(_) => Err(ShutdownError::DeadlineExceeded { deadline }),
        }
    }
}

/// Single long-running task: consumes from the buffer's readable signal
/// and from a periodic `flush_interval` tick, accumulating drained events
/// in a dispatcher-local pending queue until a full batch is ready or the
/// tick fires, then dispatches to a bulkhead-capped worker. On
/// cancellation, drains everything left (buffer plus pending), performs
/// one best-effort final flush, then waits for every spawned worker
/// before returning.
async fn dispatcher_loop(
    buffer: Arc<Buffer>,
    stats: Arc<TrackerStats>,
    config: TrackerConfig,
    store: Arc<dyn EventStore>,
    cancel: CancellationToken,
    bulkhead: Bulkhead,
) {
    let mut ticker = tokio::time::interval(config.flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately; skip it so an idle tracker doesn't
    // spin a no-op flush right at startup.
    ticker.tick().await;

    let mut pending: VecDeque<Event> = VecDeque::new();
    let mut workers: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("dispatcher shutting down: performing final flush");
                pending.extend(buffer.drain_all());
                if !pending.is_empty() {
                    let final_batch: Vec<Event> = pending.drain(..).collect();
                    write_batch_with_retry(
                        final_batch,
                        store.as_ref(),
                        &config,
                        &stats,
                        &CancellationToken::new(),
                        SHUTDOWN_WRITE_TIMEOUT,
                    )
                    .await;
                }
                break;
            }
            _ = ticker.tick() => {
                if !pending.is_empty() {
                    let take = pending.len().min(config.batch_size);
                    let batch: Vec<Event> = pending.drain(..take).collect();
                    dispatch(&mut workers, batch, &store, &config, &stats, &cancel, &bulkhead).await;
                }
            }
            () = buffer.readable() => {
                pending.extend(buffer.drain_up_to(config.buffer_size));
                while pending.len() >= config.batch_size {
                    let batch: Vec<Event> = pending.drain(..config.batch_size).collect();
                    dispatch(&mut workers, batch, &store, &config, &stats, &cancel, &bulkhead).await;
                }
            }
        }
    }

    while workers.join_next().await.is_some() {}
    debug!("dispatcher task exited: all workers finished");
}

/// Acquire a bulkhead slot — blocking the dispatcher loop if the worker
/// pool is saturated, which is the mechanism that lets sustained overload
/// translate into buffer growth (and eventually overflow) rather than
/// unbounded concurrent writers — then spawn the batch writer.
async fn dispatch(
    workers: &mut JoinSet<()>,
    batch: Vec<Event>,
    store: &Arc<dyn EventStore>,
    config: &TrackerConfig,
    stats: &Arc<TrackerStats>,
    cancel: &CancellationToken,
    bulkhead: &Bulkhead,
) {
    let permit = bulkhead.acquire_owned().await;
    let store = store.clone();
    let config = *config;
    let stats = stats.clone();
    let cancel = cancel.clone();

    workers.spawn(async move {
        let _permit = permit;
        write_batch_with_retry(batch, store.as_ref(), &config, &stats, &cancel, WRITE_TIMEOUT)
            .await;
    });
}
