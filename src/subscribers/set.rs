//! # SubscriberSet: fan-out of host events to observers.
//!
//! The host listener hands every bus event to [`SubscriberSet::emit`]. Each
//! subscriber (the host's [`InFlightTracker`](crate::InFlightTracker), a
//! [`LogWriter`](crate::LogWriter), user code) owns a bounded queue and a worker
//! task, so a slow observer never delays a runner's driver or a work unit.
//!
//! ```text
//!  Host listener ── emit(ev) ─┬─► [queue: in_flight] ─► on_event()
//!                             ├─► [queue: log]       ─► on_event()
//!                             └─► [queue: custom]    ─► on_event()
//!
//!  queue full / closed ─► Bus: SubscriberOverflow   (event lost for that subscriber only)
//!  on_event panicked   ─► Bus: SubscriberPanicked   (worker keeps consuming)
//!  shutdown()          ─► queues closed, workers drained
//! ```
//!
//! Order is FIFO per subscriber; there is no ordering across subscribers.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for multiple event subscribers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker task per subscriber.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let worker_bus = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = panic_message(&*panic_err);
                        // A panicking subscriber must not feed itself a new panic event forever.
                        if !matches!(ev.kind, EventKind::SubscriberPanicked) {
                            worker_bus.publish(Event::subscriber_panicked(sub.name(), info));
                        }
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Queues `event` for every subscriber without waiting.
    ///
    /// Overflow of a `SubscriberOverflow` event is not re-published.
    pub fn emit(&self, event: Event) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);
        let event = Arc::new(event);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Gracefully shuts down all subscriber workers.
    ///
    /// 1. Drops all channel senders (workers see channel closed)
    /// 2. Awaits all worker tasks, so every queued event is handled
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect {
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &Event) {
            if let Some(t) = ev.tick {
                self.seen.lock().unwrap().push(t);
            }
        }
        fn name(&self) -> &'static str {
            "collect"
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "explode"
        }
    }

    struct Slow;

    #[async_trait]
    impl Subscribe for Slow {
        async fn on_event(&self, _ev: &Event) {}
        fn name(&self) -> &'static str {
            "slow"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_shutdown_flushes_queued_events_in_order() {
        let bus = Bus::new(16);
        let collect = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![collect.clone()], bus);

        for t in 0..5 {
            set.emit(Event::new(EventKind::TickReceived).with_tick(t));
        }
        set.shutdown().await;

        assert_eq!(*collect.seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_panic_is_published_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Explode)], bus);

        set.emit(Event::new(EventKind::TickReceived));
        let ev = rx.recv().await.expect("panic event");
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.worker.as_deref(), Some("explode"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_full_queue_reports_overflow() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Slow)], bus);

        // Current-thread runtime: the worker has not run yet, so the queue of one fills up.
        set.emit(Event::new(EventKind::TickReceived).with_tick(0));
        set.emit(Event::new(EventKind::TickReceived).with_tick(1));

        let ev = rx.recv().await.expect("overflow event");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.worker.as_deref(), Some("slow"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_set() {
        let set = SubscriberSet::new(Vec::new(), Bus::new(1));
        set.emit(Event::new(EventKind::TickReceived));
        set.shutdown().await;
    }
}
