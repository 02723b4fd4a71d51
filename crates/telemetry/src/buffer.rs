use std::collections::VecDeque;
use std::time::Duration;

use meridian_credential::Event;
use meridian_error::TrackerError;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::stats::TrackerStats;

/// Approximate maximum time [`Buffer::submit`] may wait to enqueue before
/// taking the drop-oldest overflow path.
const GRACE_PERIOD: Duration = Duration::from_millis(100);

/// Bounded FIFO queue of pending events, shared between arbitrarily many
/// concurrent submitters and the single dispatcher task.
///
/// A hand-rolled `Mutex<VecDeque<_>>` is used instead of `tokio::sync::mpsc`
/// because the overflow path needs to pop the oldest queued event, which a
/// channel's receiver-only API does not expose to the sending side.
pub struct Buffer {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
    /// Signalled whenever an event is enqueued, so the dispatcher can wake
    /// up without polling.
    readable: Notify,
    /// Signalled whenever the dispatcher drains events, so a submitter
    /// waiting out the grace period can retry promptly instead of merely
    /// timing out.
    space_freed: Notify,
}

impl Buffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            readable: Notify::new(),
            space_freed: Notify::new(),
        }
    }

    fn try_enqueue(&self, event: Event) -> Result<(), Event> {
        let mut queue = self.queue.lock();
        if queue.len() < self.capacity {
            queue.push_back(event);
            Ok(())
        } else {
            Err(event)
        }
    }

    /// Submission contract: increment `eventsBuffered`
    /// unconditionally, attempt an immediate enqueue, then wait out the
    /// grace period for space and retry once. If the buffer is still
    /// full, drop the oldest queued event and try once more. Never blocks
    /// longer than the grace period and never returns a fatal error.
    pub async fn submit(&self, event: Event, stats: &TrackerStats) -> Result<(), TrackerError> {
        stats.record_buffered();

        let event = match self.try_enqueue(event) {
            Ok(()) => {
                self.readable.notify_one();
                return Ok(());
            }
            Err(event) => event,
        };

        let _ = tokio::time::timeout(GRACE_PERIOD, self.space_freed.notified()).await;

        let event = match self.try_enqueue(event) {
            Ok(()) => {
                self.readable.notify_one();
                return Ok(());
            }
            Err(event) => event,
        };

        warn!("credential usage buffer full, dropping oldest queued event");
        stats.record_overflow();
        {
            let mut queue = self.queue.lock();
            queue.pop_front();
        }

        match self.try_enqueue(event) {
            Ok(()) => {
                self.readable.notify_one();
                Ok(())
            }
            Err(_) => Err(TrackerError::BufferFull),
        }
    }

    /// Drain up to `max` events from the front of the queue in enqueue
    /// order, waking any submitter waiting out its grace period.
    pub(crate) fn drain_up_to(&self, max: usize) -> Vec<Event> {
        let mut queue = self.queue.lock();
        let take = max.min(queue.len());
        let drained: Vec<Event> = queue.drain(..take).collect();
        drop(queue);
        if take > 0 {
            self.space_freed.notify_waiters();
        }
        drained
    }

    /// Drain everything currently queued, used for the final flush during
    /// shutdown.
    pub(crate) fn drain_all(&self) -> Vec<Event> {
        let mut queue = self.queue.lock();
        let drained: Vec<Event> = queue.drain(..).collect();
        drop(queue);
        self.space_freed.notify_waiters();
        drained
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Wait until an event is enqueued. Used by the dispatcher loop's
    /// buffer-ready signal.
    pub(crate) async fn readable(&self) {
        self.readable.notified().await;
        debug!("buffer readable signal fired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use meridian_credential::CredentialType;

    fn sample_event() -> Event {
        Event {
            credential_type: CredentialType::ApiKey,
            credential_id: "ak_1".into(),
            user_id: "u1".into(),
            service: "openai".into(),
            endpoint: "/v1/x".into(),
            method: "POST".into(),
            status_code: 200,
            response_time_ms: 10,
            tokens_used: 0,
            request_size: 0,
            response_size: 0,
            error_type: None,
            error_message: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn submits_until_capacity_then_overflows() {
        let buffer = Buffer::new(2);
        let stats = TrackerStats::default();

        buffer.submit(sample_event(), &stats).await.unwrap();
        buffer.submit(sample_event(), &stats).await.unwrap();
        // Third submission exceeds capacity; the grace-period wait will
        // time out (nothing drains concurrently) and it falls through to
        // drop-oldest-then-retry, which succeeds since one slot frees up.
        buffer.submit(sample_event(), &stats).await.unwrap();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.events_buffered, 3);
        assert_eq!(snapshot.buffer_overflows, 1);
        assert_eq!(buffer.len(), 2);
    }

    #[tokio::test]
    async fn drain_preserves_enqueue_order() {
        let buffer = Buffer::new(10);
        let stats = TrackerStats::default();
        for i in 0..5u16 {
            let mut event = sample_event();
            event.status_code = 200 + i;
            buffer.submit(event, &stats).await.unwrap();
        }

        let drained = buffer.drain_up_to(3);
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].status_code, 200);
        assert_eq!(drained[2].status_code, 202);
        assert_eq!(buffer.len(), 2);
    }
}
