//! # Stop policies for periodic runners.
//!
//! [`StopPolicy`] determines what [`PeriodicRunner::request_stop`](crate::PeriodicRunner::request_stop)
//! does to the work units that are already in flight.
//!
//! - [`StopPolicy::Drain`] completes the tick source and waits for every in-flight unit (default).
//! - [`StopPolicy::Detach`] drops the handles of in-flight units and reports stopped at once.
//! - [`StopPolicy::CancelAwait`] lets the stop token end both the schedule and the drain wait.
//!
//! Only `Drain` keeps the host's disposal ordering safe:
//! ```text
//! Drain:       request_stop ─► source completed ─► [unit 2 runs to end] ─► Stopped ─► dispose
//! Detach:      request_stop ─► Stopped ─► dispose ─► [unit 2 ends] ─► tick(2) ─► UsedAfterDisposal
//! CancelAwait: request_stop ─► drain wait sees token ─► Stopped ─► dispose ─► ... UsedAfterDisposal
//! ```
//!
//! The two broken policies are kept so the failure can be reproduced side by side with the fix.

/// Policy controlling how a runner treats in-flight work when asked to stop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopPolicy {
    /// Stop producing ticks, then wait unconditionally for all in-flight units.
    #[default]
    Drain,
    /// Unsubscribe without draining: in-flight units keep running unobserved.
    Detach,
    /// Wait for in-flight units, but abort the wait as soon as the stop token fires.
    ///
    /// Since the same token triggered the stop, the wait returns immediately.
    CancelAwait,
}

impl StopPolicy {
    /// True if `wait_stopped()` returning guarantees no unit is still running.
    #[inline]
    pub fn drains(&self) -> bool {
        matches!(self, StopPolicy::Drain)
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopPolicy::Drain => "drain",
            StopPolicy::Detach => "detach",
            StopPolicy::CancelAwait => "cancel_await",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_drain() {
        assert_eq!(StopPolicy::default(), StopPolicy::Drain);
        assert!(StopPolicy::default().drains());
    }

    #[test]
    fn test_anti_patterns_do_not_drain() {
        assert!(!StopPolicy::Detach.drains());
        assert!(!StopPolicy::CancelAwait.drains());
        assert_eq!(StopPolicy::CancelAwait.as_label(), "cancel_await");
    }
}
