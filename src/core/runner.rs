//! # PeriodicRunner: one work unit per tick, drain on stop.
//!
//! A runner owns a [`TickSource`] and the set of in-flight work units. Each tick
//! dispatches one unit of its [`Work`](crate::Work) as its own tokio task in a
//! `JoinSet`, so the driver can wait for them.
//!
//! ## Architecture
//! ```text
//! start() ──► TickSource::spawn ──► driver loop
//!                                     │
//!                                     ├─► wait for a free slot (Sequential = 1, Concurrent = n)
//!                                     ├─► tick = source.next()        (None once source completed)
//!                                     ├─► publish TickReceived
//!                                     ├─► stop requested? ─► TickDropped, leave loop
//!                                     └─► in_flight.spawn(unit)
//!
//! request_stop() ──► StopRequested
//!                    ├─► cancel stop token    (units check it at entry only)
//!                    └─► complete the source  (driver sees end of stream)
//!
//! driver after loop (StopPolicy):
//!   Drain       ─► join every unit in in_flight, then Stopped
//!   CancelAwait ─► await in_flight OR stop token (already fired) ─► Stopped with units running
//!   Detach      ─► request_stop() already reported Stopped; units are detached
//! ```
//!
//! ## Rules
//! - Ticks are dispatched in sequence order; none after stop was observed
//! - Units are never cancelled mid-flight; failures and panics are isolated per unit
//! - Under `StopPolicy::Drain`, `Stopped` implies `stats().in_flight() == 0`

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{select, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    config::RunnerConfig,
    core::{
        schedule::TickSource,
        state::{RunnerState, StateCell},
    },
    error::{RunnerError, WorkError, panic_message},
    events::{Bus, Event, EventKind},
    policies::StopPolicy,
    tasks::WorkRef,
};

/// Counters of a runner's work units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Units spawned.
    pub dispatched: u64,
    /// Units that finished successfully.
    pub completed: u64,
    /// Units that saw the stop flag at entry.
    pub skipped: u64,
    /// Units that returned an error or panicked.
    pub failed: u64,
    /// Units still running when the runner reported `Stopped`.
    pub abandoned: u64,
}

impl RunnerStats {
    /// Units that reached an outcome.
    pub fn finished(&self) -> u64 {
        self.completed + self.skipped + self.failed
    }

    /// Units spawned but not finished yet.
    pub fn in_flight(&self) -> u64 {
        self.dispatched.saturating_sub(self.finished())
    }
}

#[derive(Default)]
struct Tally {
    dispatched: AtomicU64,
    completed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
}

impl Tally {
    fn snapshot(&self) -> RunnerStats {
        // Outcomes first: a unit is counted as dispatched before it can finish.
        let completed = self.completed.load(Ordering::Acquire);
        let skipped = self.skipped.load(Ordering::Acquire);
        let failed = self.failed.load(Ordering::Acquire);
        RunnerStats {
            dispatched: self.dispatched.load(Ordering::Acquire),
            completed,
            skipped,
            failed,
            abandoned: self.abandoned.load(Ordering::Acquire),
        }
    }
}

struct Inner {
    name: Arc<str>,
    work: WorkRef,
    cfg: RunnerConfig,
    bus: Bus,
    state: StateCell,
    /// Cooperative stop flag handed to every unit.
    stopping: CancellationToken,
    /// Completion token of the tick source.
    schedule: CancellationToken,
    tally: Tally,
}

/// Drives a [`Work`](crate::Work) on a fixed period and stops without abandoning it.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tickvisor::{Bus, PeriodicRunner, RunnerConfig, SharedResource, Ticker, TickerWork};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resource = Arc::new(SharedResource::new("ticker"));
///     let work = TickerWork::arc("tick", Ticker::new(resource.clone()), Duration::from_millis(20));
///
///     let mut cfg = RunnerConfig::default();
///     cfg.interval = Duration::from_millis(10);
///     let runner = PeriodicRunner::new("worker", work, cfg, Bus::new(64));
///
///     runner.start()?;
///     tokio::time::sleep(Duration::from_millis(50)).await;
///     runner.request_stop()?;
///     runner.wait_stopped().await?;
///
///     assert_eq!(runner.stats().in_flight(), 0);
///     resource.dispose();
///     Ok(())
/// }
/// ```
pub struct PeriodicRunner {
    inner: Arc<Inner>,
}

impl PeriodicRunner {
    /// Creates an idle runner publishing to `bus`.
    pub fn new(name: impl Into<Arc<str>>, work: WorkRef, cfg: RunnerConfig, bus: Bus) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                work,
                cfg,
                bus,
                state: StateCell::new(),
                stopping: CancellationToken::new(),
                schedule: CancellationToken::new(),
                tally: Tally::default(),
            }),
        }
    }

    /// Runner name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.inner.state.get()
    }

    /// Snapshot of the unit counters.
    pub fn stats(&self) -> RunnerStats {
        self.inner.tally.snapshot()
    }

    /// Configuration the runner was built with.
    pub fn config(&self) -> &RunnerConfig {
        &self.inner.cfg
    }

    /// Starts the schedule in the background and returns immediately.
    ///
    /// Fails with [`RunnerError::DoubleStart`] unless the runner is `Idle`.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), RunnerError> {
        let inner = &self.inner;
        if inner
            .state
            .transition(&[RunnerState::Idle], RunnerState::Running)
            .is_err()
        {
            return Err(RunnerError::DoubleStart {
                runner: inner.name.to_string(),
            });
        }

        let source = TickSource::spawn(
            inner.cfg.interval_clamped(),
            inner.cfg.first_tick,
            inner.cfg.tick_buffer_clamped(),
            inner.schedule.clone(),
        );
        inner.publish(Event::new(EventKind::WorkerStarting).with_delay(inner.cfg.interval_clamped()));
        tokio::spawn(Arc::clone(inner).drive(source));
        Ok(())
    }

    /// Signals that no new ticks or units should start. Does not block.
    ///
    /// - `Running` → `StopRequested`
    /// - `StopRequested` → no-op (the signal is one-shot)
    /// - `Idle` / `Stopped` → [`RunnerError::InvalidStateTransition`]
    pub fn request_stop(&self) -> Result<(), RunnerError> {
        let inner = &self.inner;
        match inner
            .state
            .transition(&[RunnerState::Running], RunnerState::StopRequested)
        {
            Ok(_) => {}
            Err(RunnerState::StopRequested) => return Ok(()),
            Err(from) => {
                return Err(RunnerError::InvalidStateTransition {
                    runner: inner.name.to_string(),
                    from,
                    op: "request_stop",
                });
            }
        }

        inner.publish(
            Event::new(EventKind::WorkerStopping)
                .with_in_flight(inner.tally.snapshot().in_flight())
                .with_reason(inner.cfg.stop_policy.as_label()),
        );
        // The flag first: the driver checks it before dispatching a buffered tick.
        inner.stopping.cancel();
        inner.schedule.cancel();

        if inner.cfg.stop_policy == StopPolicy::Detach {
            inner.finish();
        }
        Ok(())
    }

    /// Waits until the runner reached `Stopped`.
    ///
    /// Under [`StopPolicy::Drain`] this means every unit dispatched before the stop
    /// request has finished. Fails with [`RunnerError::InvalidStateTransition`] if the
    /// runner was never started, since it could never stop.
    pub async fn wait_stopped(&self) -> Result<(), RunnerError> {
        let inner = &self.inner;
        if inner.state.get() == RunnerState::Idle {
            return Err(RunnerError::InvalidStateTransition {
                runner: inner.name.to_string(),
                from: RunnerState::Idle,
                op: "wait_stopped",
            });
        }
        inner.state.wait_for(RunnerState::Stopped).await;
        Ok(())
    }
}

impl Inner {
    /// Driver loop: consumes ticks, dispatches units, then applies the stop policy.
    async fn drive(self: Arc<Self>, mut source: TickSource) {
        let limit = self.cfg.concurrency_limit();
        let mut in_flight: JoinSet<()> = JoinSet::new();

        'dispatch: loop {
            if let Some(limit) = limit {
                while in_flight.len() >= limit {
                    if self.until_stop(in_flight.join_next()).await.is_none() {
                        break 'dispatch;
                    }
                }
            }

            let tick = match self.until_stop(source.next()).await {
                Some(Some(tick)) => tick,
                _ => break,
            };
            self.publish(Event::new(EventKind::TickReceived).with_tick(tick.seq));

            if self.stopping.is_cancelled() {
                self.publish(Event::new(EventKind::TickDropped).with_tick(tick.seq));
                break;
            }
            self.tally.dispatched.fetch_add(1, Ordering::AcqRel);
            in_flight.spawn(Arc::clone(&self).run_unit(tick.seq));
        }

        // Ticks still buffered after the stop are discarded, never dispatched.
        source.complete();

        match self.cfg.stop_policy {
            StopPolicy::Drain => while in_flight.join_next().await.is_some() {},
            StopPolicy::CancelAwait => {
                let drain = async { while in_flight.join_next().await.is_some() {} };
                select! {
                    biased;
                    _ = self.stopping.cancelled() => {}
                    _ = drain => {}
                }
            }
            StopPolicy::Detach => {}
        }
        // Dropping a JoinSet aborts its tasks; units must never be cut short.
        in_flight.detach_all();
        self.finish();
    }

    /// Runs `fut` to completion, or returns `None` once stop was requested when the
    /// policy lets the stop token cancel the consumer.
    async fn until_stop<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.cfg.stop_policy.drains() {
            return Some(fut.await);
        }
        select! {
            biased;
            _ = self.stopping.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Executes one unit and records its outcome.
    async fn run_unit(self: Arc<Self>, tick: u64) {
        self.publish(Event::new(EventKind::WorkStarting).with_tick(tick));

        let res = AssertUnwindSafe(self.work.run(tick, self.stopping.clone()))
            .catch_unwind()
            .await;
        match res {
            Ok(Ok(())) => {
                self.tally.completed.fetch_add(1, Ordering::AcqRel);
                self.publish(Event::new(EventKind::WorkCompleted).with_tick(tick));
            }
            Ok(Err(WorkError::Canceled)) => {
                self.tally.skipped.fetch_add(1, Ordering::AcqRel);
                self.publish(Event::new(EventKind::WorkSkipped).with_tick(tick));
            }
            Ok(Err(e)) => {
                self.tally.failed.fetch_add(1, Ordering::AcqRel);
                self.publish(
                    Event::new(EventKind::WorkFailed)
                        .with_tick(tick)
                        .with_reason(e.to_string()),
                );
            }
            Err(panic_err) => {
                self.tally.failed.fetch_add(1, Ordering::AcqRel);
                self.publish(
                    Event::new(EventKind::WorkFailed)
                        .with_tick(tick)
                        .with_reason(format!("panicked: {}", panic_message(&*panic_err))),
                );
            }
        }
    }

    /// Moves to `Stopped` (first caller wins) and reports abandoned units.
    fn finish(&self) {
        let in_flight = self.tally.snapshot().in_flight();
        // Sequenced before the transition so it precedes anything a waiter publishes.
        let stopped = Event::new(EventKind::WorkerStopped).with_in_flight(in_flight);

        let moved = self.state.transition(
            &[RunnerState::Running, RunnerState::StopRequested],
            RunnerState::Stopped,
        );
        if moved.is_err() {
            return;
        }

        if in_flight > 0 {
            self.tally.abandoned.fetch_add(in_flight, Ordering::AcqRel);
            self.publish(Event::new(EventKind::WorkAbandoned).with_in_flight(in_flight));
        }
        self.publish(stopped);
    }

    fn publish(&self, ev: Event) {
        self.bus.publish_from(Arc::clone(&self.name), ev);
    }
}
