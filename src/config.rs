//! # Runtime configuration.
//!
//! Provides [`HostConfig`] and [`RunnerConfig`], the centralized settings for the
//! host and for each periodic runner.
//!
//! ## Sentinel values
//! - `HostConfig::grace = 0s` → unbounded drain wait (no timeout)
//! - `Dispatch::Concurrent { limit: 0 }` → no cap on in-flight units
//! - `RunnerConfig::interval = 0s` → clamped to 1ms
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use tickvisor::{Dispatch, FirstTick, RunnerConfig, StopPolicy};
//!
//! let mut cfg = RunnerConfig::default();
//! cfg.interval = Duration::from_millis(250);
//! cfg.dispatch = Dispatch::Concurrent { limit: 4 };
//! cfg.first_tick = FirstTick::AfterInterval;
//!
//! assert_eq!(cfg.concurrency_limit(), Some(4));
//! assert_eq!(cfg.stop_policy, StopPolicy::Drain);
//! ```

use std::time::Duration;

use crate::policies::StopPolicy;

/// How work units are dispatched relative to each other.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// One unit at a time; the next tick is consumed only after the previous unit finished.
    #[default]
    Sequential,
    /// Up to `limit` units in flight (`0` = unbounded).
    Concurrent {
        /// Maximum number of overlapping units.
        limit: usize,
    },
}

/// When the first tick fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FirstTick {
    /// Ticks at `t = 0, interval, 2*interval, ...`.
    #[default]
    Immediate,
    /// Ticks at `t = interval, 2*interval, ...`.
    AfterInterval,
}

/// Configuration of a single [`PeriodicRunner`](crate::PeriodicRunner).
///
/// ## Field semantics
/// - `interval`: period of the schedule
/// - `dispatch`: sequential (default) or bounded-concurrent dispatch
/// - `first_tick`: whether the schedule fires at start or one period later
/// - `tick_buffer`: capacity of the tick channel (min 1)
/// - `stop_policy`: what stop does to in-flight units
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Schedule period.
    pub interval: Duration,
    /// Dispatch mode.
    pub dispatch: Dispatch,
    /// First tick placement.
    pub first_tick: FirstTick,
    /// Capacity of the channel between the tick source and the runner.
    ///
    /// Ticks produced while the buffer is full wait for the runner; the source
    /// does not pile up an unbounded backlog.
    pub tick_buffer: usize,
    /// Shutdown behavior for in-flight units.
    pub stop_policy: StopPolicy,
}

impl RunnerConfig {
    /// Returns the in-flight cap as an `Option`.
    ///
    /// - `Some(1)` → sequential
    /// - `Some(n)` → at most `n` units in flight
    /// - `None` → unbounded
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        match self.dispatch {
            Dispatch::Sequential => Some(1),
            Dispatch::Concurrent { limit: 0 } => None,
            Dispatch::Concurrent { limit } => Some(limit),
        }
    }

    /// Returns the schedule period, clamped to at least 1ms.
    #[inline]
    pub fn interval_clamped(&self) -> Duration {
        self.interval.max(Duration::from_millis(1))
    }

    /// Returns the tick buffer capacity clamped to a minimum of 1.
    #[inline]
    pub fn tick_buffer_clamped(&self) -> usize {
        self.tick_buffer.max(1)
    }
}

impl Default for RunnerConfig {
    /// Default configuration:
    ///
    /// - `interval = 1s`
    /// - `dispatch = Sequential`
    /// - `first_tick = Immediate`
    /// - `tick_buffer = 1`
    /// - `stop_policy = Drain`
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            dispatch: Dispatch::default(),
            first_tick: FirstTick::default(),
            tick_buffer: 1,
            stop_policy: StopPolicy::default(),
        }
    }
}

/// Configuration of the [`Host`](crate::Host).
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Maximum time to wait for workers to drain during shutdown.
    ///
    /// - `Duration::ZERO` = wait until every in-flight unit finished
    /// - `> 0` = give up after `grace`, report `RuntimeError::GraceExceeded`
    ///   and skip disposing the shared resource
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,
}

impl HostConfig {
    /// Returns the drain bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        if self.grace == Duration::ZERO {
            None
        } else {
            Some(self.grace)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for HostConfig {
    /// Default configuration:
    ///
    /// - `grace = 0s` (unbounded drain)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            grace: Duration::ZERO,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_is_limit_one() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.concurrency_limit(), Some(1));
    }

    #[test]
    fn test_zero_limit_is_unbounded() {
        let cfg = RunnerConfig {
            dispatch: Dispatch::Concurrent { limit: 0 },
            ..RunnerConfig::default()
        };
        assert_eq!(cfg.concurrency_limit(), None);
    }

    #[test]
    fn test_clamps() {
        let cfg = RunnerConfig {
            interval: Duration::ZERO,
            tick_buffer: 0,
            ..RunnerConfig::default()
        };
        assert_eq!(cfg.interval_clamped(), Duration::from_millis(1));
        assert_eq!(cfg.tick_buffer_clamped(), 1);

        let host = HostConfig {
            grace: Duration::ZERO,
            bus_capacity: 0,
        };
        assert_eq!(host.grace_limit(), None);
        assert_eq!(host.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_non_zero_grace_is_bounded() {
        let host = HostConfig {
            grace: Duration::from_secs(3),
            ..HostConfig::default()
        };
        assert_eq!(host.grace_limit(), Some(Duration::from_secs(3)));
    }
}
