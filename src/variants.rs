//! # Worker presets.
//!
//! Each [`WorkerVariant`] bundles a [`RunnerConfig`] and a work duration that
//! reproduce one way of writing a periodic background worker. Two of them report
//! `Stopped` while a unit is still running and are kept to make that race
//! observable; use [`WorkerVariant::Fixed`] or [`WorkerVariant::Timer`] otherwise.
//!
//! | Variant       | Stop policy   | Dispatch   | Work | Safe |
//! |---------------|---------------|------------|------|------|
//! | `Unsubscribe` | `Detach`      | concurrent | 1 s  | no   |
//! | `TokenBound`  | `CancelAwait` | concurrent | 1 s  | no   |
//! | `Fixed`       | `Drain`       | concurrent | 2 s  | yes  |
//! | `Timer`       | `Drain`       | sequential | 2 s  | yes  |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{Dispatch, FirstTick, RunnerConfig},
    core::{Host, PeriodicRunner},
    policies::StopPolicy,
    resource::{Ticker, TickerWork},
};

/// A preset periodic worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerVariant {
    /// Stop unsubscribes from the schedule and forgets running units.
    Unsubscribe,
    /// The stop token bounds both the schedule and the wait for running units.
    TokenBound,
    /// Stop completes the schedule; every running unit is awaited.
    Fixed,
    /// One unit at a time, awaited before the next tick is taken.
    Timer,
}

impl WorkerVariant {
    /// All variants, unsafe ones first.
    pub const ALL: [WorkerVariant; 4] = [
        WorkerVariant::Unsubscribe,
        WorkerVariant::TokenBound,
        WorkerVariant::Fixed,
        WorkerVariant::Timer,
    ];

    /// Returns a short stable label (snake_case) for use in logs and on the command line.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerVariant::Unsubscribe => "unsubscribe",
            WorkerVariant::TokenBound => "token_bound",
            WorkerVariant::Fixed => "fixed",
            WorkerVariant::Timer => "timer",
        }
    }

    /// Stop policy of the preset.
    pub fn stop_policy(&self) -> StopPolicy {
        match self {
            WorkerVariant::Unsubscribe => StopPolicy::Detach,
            WorkerVariant::TokenBound => StopPolicy::CancelAwait,
            WorkerVariant::Fixed | WorkerVariant::Timer => StopPolicy::Drain,
        }
    }

    /// Runner configuration for a schedule of `interval`.
    pub fn runner_config(&self, interval: Duration) -> RunnerConfig {
        let dispatch = match self {
            WorkerVariant::Timer => Dispatch::Sequential,
            _ => Dispatch::Concurrent { limit: 0 },
        };
        RunnerConfig {
            interval,
            dispatch,
            first_tick: FirstTick::AfterInterval,
            stop_policy: self.stop_policy(),
            ..RunnerConfig::default()
        }
    }

    /// Non-cancellable time each unit spends before touching the resource.
    pub fn work_duration(&self) -> Duration {
        match self {
            WorkerVariant::Unsubscribe | WorkerVariant::TokenBound => Duration::from_secs(1),
            WorkerVariant::Fixed | WorkerVariant::Timer => Duration::from_secs(2),
        }
    }

    /// True if the host may dispose the resource as soon as this worker reports `Stopped`.
    pub fn is_shutdown_safe(&self) -> bool {
        self.stop_policy().drains()
    }

    /// Registers this preset on `host` as a worker named after the variant.
    pub fn install(&self, host: &mut Host, interval: Duration) -> Arc<PeriodicRunner> {
        let work = TickerWork::arc(
            self.as_label(),
            Ticker::new(host.resource()),
            self.work_duration(),
        );
        host.add_worker(self.as_label(), work, self.runner_config(interval))
    }
}

impl fmt::Display for WorkerVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for WorkerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        WorkerVariant::ALL
            .into_iter()
            .find(|v| v.as_label() == norm)
            .ok_or_else(|| {
                let known: Vec<_> = WorkerVariant::ALL.iter().map(|v| v.as_label()).collect();
                format!("unknown variant '{s}', expected one of: {}", known.join(", "))
            })
    }
}
