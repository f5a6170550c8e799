//! # In-flight work tracker with sequence-based ordering.
//!
//! Maintains the set of work units that have started but not finished, keyed by
//! worker name and tick, using event sequence numbers to handle out-of-order delivery.
//!
//! ## Architecture
//! ```text
//! Host ──► Bus ──► subscriber_listener() ──► SubscriberSet ──► InFlightTracker::update()
//!                                                                     │
//!                                                                     ▼
//!                                                    HashMap<(worker, tick), UnitState>
//! ```
//!
//! ## Rules
//! - `WorkStarting` marks a unit in flight
//! - `WorkCompleted` / `WorkSkipped` / `WorkFailed` mark it finished
//! - Events with `seq <= last_seq` for the same unit are **rejected** (stale)
//! - Finished units are forgotten; only out-of-order finishes leave a tombstone
//! - Reads are **eventually consistent** with the runners' own counters

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Per-unit state for ordering validation.
#[derive(Debug, Clone, Copy)]
struct UnitState {
    last_seq: u64,
    running: bool,
}

/// Thread-safe tracker of running work units.
///
/// Used by the [`Host`](crate::Host) to name stuck ticks when the shutdown
/// grace period is exceeded.
#[derive(Default)]
pub struct InFlightTracker {
    state: RwLock<HashMap<(String, u64), UnitState>>,
}

impl InFlightTracker {
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a work event if it is newer than the last one seen for the same unit.
    ///
    /// Returns `true` if the running state changed.
    pub async fn update(&self, ev: &Event) -> bool {
        let running = match ev.kind {
            EventKind::WorkStarting => true,
            EventKind::WorkCompleted | EventKind::WorkSkipped | EventKind::WorkFailed => false,
            _ => return false,
        };
        let (Some(worker), Some(tick)) = (ev.worker.as_deref(), ev.tick) else {
            return false;
        };

        let key = (worker.to_string(), tick);
        let mut state = self.state.write().await;
        let entry = state.entry(key.clone()).or_insert(UnitState {
            last_seq: 0,
            running: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        let changed = entry.running != running;
        entry.running = running;

        // A unit publishes start and finish from one task, so a finished unit that
        // was seen starting cannot receive a stale start later. Keep only tombstones
        // for finishes that overtook their start.
        if changed && !running {
            state.remove(&key);
        }
        changed
    }

    /// Returns sorted `worker#tick` labels of units currently running.
    pub async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut running: Vec<(String, u64)> = state
            .iter()
            .filter(|(_, u)| u.running)
            .map(|(k, _)| k.clone())
            .collect();
        running.sort_unstable();
        running
            .into_iter()
            .map(|(w, t)| format!("{w}#{t}"))
            .collect()
    }
}

#[async_trait]
impl Subscribe for InFlightTracker {
    async fn on_event(&self, event: &Event) {
        self.update(event).await;
    }

    fn name(&self) -> &'static str {
        "InFlightTracker"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, tick: u64) -> Event {
        Event::new(kind).with_worker("w").with_tick(tick)
    }

    #[tokio::test]
    async fn test_start_then_finish() {
        let tracker = InFlightTracker::new();
        assert!(tracker.update(&ev(EventKind::WorkStarting, 0)).await);
        assert!(tracker.update(&ev(EventKind::WorkStarting, 1)).await);
        assert_eq!(tracker.snapshot().await, vec!["w#0", "w#1"]);

        assert!(tracker.update(&ev(EventKind::WorkCompleted, 0)).await);
        assert_eq!(tracker.snapshot().await, vec!["w#1"]);
    }

    #[tokio::test]
    async fn test_stale_event_rejected() {
        let tracker = InFlightTracker::new();
        let start = ev(EventKind::WorkStarting, 4);
        let done = ev(EventKind::WorkFailed, 4);

        assert!(!tracker.update(&done).await);
        // Starting arrives late: its seq is older than the failure already applied.
        assert!(!tracker.update(&start).await);
        assert!(tracker.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_ignores_unrelated_events() {
        let tracker = InFlightTracker::new();
        assert!(!tracker.update(&ev(EventKind::TickReceived, 1)).await);
        assert!(!tracker.update(&Event::new(EventKind::WorkStarting)).await);
        assert!(tracker.snapshot().await.is_empty());
    }
}
