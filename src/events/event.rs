//! # Runtime events emitted by the host, runners and the shared resource.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Worker lifecycle**: starting, stopping, stopped
//! - **Work flow**: tick received/dropped, unit starting/completed/skipped/failed/abandoned
//! - **Host shutdown**: shutdown requested, drained within grace, grace exceeded
//! - **Resource**: disposed, used after disposal
//!
//! The [`Event`] struct carries additional metadata such as timestamps, worker name,
//! tick sequence number, reasons and in-flight counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use tickvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkFailed)
//!     .with_worker("rx-worker")
//!     .with_tick(3)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::WorkFailed);
//! assert_eq!(ev.worker.as_deref(), Some("rx-worker"));
//! assert_eq!(ev.tick, Some(3));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `worker`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Host shutdown events ===
    /// Host began shutting down (signal observed or explicit call).
    ///
    /// Sets:
    /// - `reason`: signal name, when a signal triggered it
    ShutdownRequested,

    /// All workers drained within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some units were still running.
    ///
    /// Sets:
    /// - `delay_ms`: configured grace (ms)
    /// - `in_flight`: number of stuck units
    /// - `reason`: stuck ticks as `worker#tick`, comma-separated
    GraceExceeded,

    // === Worker lifecycle ===
    /// Runner started its schedule.
    ///
    /// Sets:
    /// - `worker`: runner name
    /// - `delay_ms`: schedule interval (ms)
    WorkerStarting,

    /// Runner received a stop request.
    ///
    /// Sets:
    /// - `worker`: runner name
    /// - `in_flight`: units running at the time of the request
    /// - `reason`: stop policy label
    WorkerStopping,

    /// Runner reached `Stopped`.
    ///
    /// Sets:
    /// - `worker`: runner name
    /// - `in_flight`: units still running (non-zero only for non-draining policies)
    WorkerStopped,

    // === Work flow ===
    /// Tick arrived from the schedule source.
    ///
    /// Sets:
    /// - `worker`, `tick`
    TickReceived,

    /// Buffered tick discarded because stop was already requested.
    ///
    /// Sets:
    /// - `worker`, `tick`
    TickDropped,

    /// Work unit is starting.
    ///
    /// Sets:
    /// - `worker`, `tick`
    WorkStarting,

    /// Work unit finished successfully.
    ///
    /// Sets:
    /// - `worker`, `tick`
    WorkCompleted,

    /// Work unit observed the stop flag at entry and did nothing.
    ///
    /// Sets:
    /// - `worker`, `tick`
    WorkSkipped,

    /// Work unit failed (error or panic); the schedule continues.
    ///
    /// Sets:
    /// - `worker`, `tick`
    /// - `reason`: failure message
    WorkFailed,

    /// Runner stopped while units were still in flight; nobody waits for them.
    ///
    /// Sets:
    /// - `worker`
    /// - `in_flight`: number of abandoned units
    WorkAbandoned,

    // === Resource ===
    /// Shared resource transitioned to disposed.
    ///
    /// Sets:
    /// - `worker`: resource name
    ResourceDisposed,

    /// Shared resource was invoked after disposal.
    ///
    /// Sets:
    /// - `worker`: resource name
    /// - `tick`: payload of the rejected call
    UsedAfterDisposal,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the runner, subscriber or resource, if applicable.
    pub worker: Option<Arc<str>>,
    /// Tick sequence number, if applicable.
    pub tick: Option<u64>,
    /// Human-readable reason (errors, policy labels, overflow details).
    pub reason: Option<Arc<str>>,
    /// Number of units in flight when the event was produced.
    pub in_flight: Option<u64>,
    /// Interval or grace in milliseconds (compact).
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            tick: None,
            reason: None,
            in_flight: None,
            delay_ms: None,
        }
    }

    /// Attaches a worker/resource name.
    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    /// Attaches a tick sequence number.
    #[inline]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an in-flight count.
    #[inline]
    pub fn with_in_flight(mut self, n: u64) -> Self {
        self.in_flight = Some(n);
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for the event that proves a shutdown-ordering bug.
    #[inline]
    pub fn is_disposal_violation(&self) -> bool {
        matches!(self.kind, EventKind::UsedAfterDisposal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::TickReceived);
        let b = Event::new(EventKind::TickReceived);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::WorkerStarting).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_overflow_helper() {
        let ev = Event::subscriber_overflow("log", "full");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.worker.as_deref(), Some("log"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
        assert!(!ev.is_disposal_violation());
    }
}
