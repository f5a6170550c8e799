//! # Disposable shared dependency.
//!
//! [`SharedResource`] is owned by the host and referenced by work units. Its only
//! state is an atomic `disposed` flag: once set, every call fails with
//! [`ResourceError::UsedAfterDisposal`].
//!
//! ## Rules
//! - `Active → Disposed` happens exactly once and is irreversible
//! - `dispose()` is idempotent; only the first call publishes `ResourceDisposed`
//! - No locking around `invoke`: the host must sequence `dispose()` after every
//!   runner drained
//! - State is constant-size: accepted calls are counted, not stored
//!
//! ## Example
//! ```rust
//! use tickvisor::{ResourceError, SharedResource};
//!
//! let res = SharedResource::new("ticker");
//! res.invoke(0).unwrap();
//! res.dispose();
//! res.dispose();
//!
//! assert!(matches!(res.invoke(1), Err(ResourceError::UsedAfterDisposal { .. })));
//! assert_eq!(res.accepted(), 1);
//! assert_eq!(res.last_accepted(), Some(0));
//! assert_eq!(res.violations(), 1);
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::info;

use crate::error::ResourceError;
use crate::events::{Bus, Event, EventKind};

/// Disposable dependency shared by all work units of a host.
#[derive(Debug)]
pub struct SharedResource {
    name: String,
    disposed: AtomicBool,
    violations: AtomicU64,
    accepted: AtomicU64,
    /// Last accepted sequence number plus one; `0` until the first call.
    last: AtomicU64,
    bus: Option<Bus>,
}

impl SharedResource {
    /// Creates an active resource.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disposed: AtomicBool::new(false),
            violations: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            last: AtomicU64::new(0),
            bus: None,
        }
    }

    /// Publishes disposal and violations on `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accepts `seq`, or fails if the resource was already disposed.
    pub fn invoke(&self, seq: u64) -> Result<(), ResourceError> {
        if self.disposed.load(Ordering::Acquire) {
            self.violations.fetch_add(1, Ordering::Relaxed);
            self.publish(Event::new(EventKind::UsedAfterDisposal).with_tick(seq));
            return Err(ResourceError::UsedAfterDisposal {
                resource: self.name.clone(),
            });
        }
        info!(resource = %self.name, tick = seq, "tick");
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.last.store(seq.saturating_add(1), Ordering::Relaxed);
        Ok(())
    }

    /// Marks the resource disposed. Subsequent calls are no-ops.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.publish(Event::new(EventKind::ResourceDisposed));
        }
    }

    /// True once [`dispose`](Self::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Number of calls accepted while active.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Sequence number of the most recent accepted call.
    pub fn last_accepted(&self) -> Option<u64> {
        self.last.load(Ordering::Relaxed).checked_sub(1)
    }

    /// Number of calls rejected because the resource was disposed.
    pub fn violations(&self) -> u64 {
        self.violations.load(Ordering::Relaxed)
    }

    fn publish(&self, ev: Event) {
        if let Some(bus) = &self.bus {
            bus.publish_from(self.name.as_str(), ev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_counts_calls() {
        let res = SharedResource::new("r");
        assert_eq!(res.last_accepted(), None);
        for i in 0..3 {
            res.invoke(i).unwrap();
        }
        assert_eq!(res.accepted(), 3);
        assert_eq!(res.last_accepted(), Some(2));
        assert!(!res.is_disposed());
        assert_eq!(res.violations(), 0);
    }

    #[test]
    fn test_use_after_disposal_fails() {
        let res = SharedResource::new("r");
        res.dispose();
        let err = res.invoke(5).unwrap_err();
        assert_eq!(
            err,
            ResourceError::UsedAfterDisposal {
                resource: "r".into()
            }
        );
        assert_eq!(res.accepted(), 0);
        assert_eq!(res.violations(), 1);
    }

    #[test]
    fn test_long_run_keeps_constant_state() {
        let res = SharedResource::new("r");
        for i in 0..100_000 {
            res.invoke(i).unwrap();
        }
        assert_eq!(res.accepted(), 100_000);
        assert_eq!(res.last_accepted(), Some(99_999));
    }

    #[tokio::test]
    async fn test_dispose_is_idempotent() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let res = SharedResource::new("r").with_bus(bus);

        res.dispose();
        res.dispose();
        assert!(res.is_disposed());
        assert_eq!(res.violations(), 0);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ResourceDisposed);
        assert_eq!(ev.worker.as_deref(), Some("r"));
        assert!(rx.try_recv().is_err(), "second dispose must not publish");
    }

    #[tokio::test]
    async fn test_violation_is_published() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let res = SharedResource::new("r").with_bus(bus);
        res.dispose();
        let _ = rx.recv().await.unwrap();

        assert!(res.invoke(9).is_err());
        let ev = rx.recv().await.unwrap();
        assert!(ev.is_disposal_violation());
        assert_eq!(ev.tick, Some(9));
    }
}
