//! # Host: owns the shared resource and sequences shutdown.
//!
//! The [`Host`] owns the event bus, a [`SubscriberSet`], the [`InFlightTracker`] and
//! the [`SharedResource`] its workers use. It is the only component allowed to
//! dispose the resource, and it does so strictly after every worker reported
//! `Stopped`.
//!
//! ## Architecture
//! ```text
//! Host::builder(cfg).with_subscribers(..).build()
//!   ├─► Bus::for_host(&cfg)
//!   ├─► SubscriberSet(user subscribers + InFlightTracker)
//!   ├─► SharedResource::new(name).with_bus(bus)
//!   └─► subscriber_listener: Bus.subscribe() ─► SubscriberSet::emit(Event)
//!
//! add_worker(name, work, cfg) ─► PeriodicRunner (Idle)
//! start()                     ─► every Idle worker: start()
//!
//! shutdown():
//!   Bus.publish(ShutdownRequested)
//!   ├─► request_stop() on every worker, last added first
//!   ├─► wait_stopped() on every worker, bounded by cfg.grace
//!   │      ├─ all Stopped   ─► AllStoppedWithin ─► resource.dispose() ─► ShutdownReport
//!   │      └─ grace elapsed ─► GraceExceeded    ─► resource left Active
//!   └─► close(): stop listener, flush subscriber queues
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tickvisor::{Host, HostConfig, RunnerConfig, Ticker, TickerWork};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut host = Host::builder(HostConfig::default()).build();
//!
//!     let work = TickerWork::arc("tick", Ticker::new(host.resource()), Duration::from_millis(20));
//!     let mut cfg = RunnerConfig::default();
//!     cfg.interval = Duration::from_millis(10);
//!     host.add_worker("ticker", work, cfg);
//!
//!     let report = host
//!         .run_until(tokio::time::sleep(Duration::from_millis(50)))
//!         .await?;
//!     assert_eq!(report.totals().in_flight(), 0);
//!     assert_eq!(host.resource().violations(), 0);
//!
//!     host.close().await;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::{select, sync::broadcast::error::RecvError, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{HostConfig, RunnerConfig},
    core::{
        runner::{PeriodicRunner, RunnerStats},
        shutdown,
        state::RunnerState,
    },
    error::{RunnerError, RuntimeError},
    events::{Bus, Event, EventKind},
    resource::SharedResource,
    subscribers::{InFlightTracker, Subscribe, SubscriberSet},
    tasks::WorkRef,
};

/// Final state of one worker after shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker name.
    pub name: String,
    /// State observed when the report was taken.
    pub state: RunnerState,
    /// Unit counters.
    pub stats: RunnerStats,
}

/// Outcome of a completed [`Host::shutdown`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// One entry per worker, in the order they were added.
    pub workers: Vec<WorkerReport>,
}

impl ShutdownReport {
    /// Sum of every worker's counters.
    pub fn totals(&self) -> RunnerStats {
        self.workers
            .iter()
            .fold(RunnerStats::default(), |mut acc, w| {
                acc.dispatched += w.stats.dispatched;
                acc.completed += w.stats.completed;
                acc.skipped += w.stats.skipped;
                acc.failed += w.stats.failed;
                acc.abandoned += w.stats.abandoned;
                acc
            })
    }
}

/// Builder for [`Host`].
pub struct HostBuilder {
    cfg: HostConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
    resource_name: String,
}

impl HostBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: HostConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            resource_name: "shared".to_string(),
        }
    }

    /// Sets event subscribers. The host always adds its own [`InFlightTracker`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Names the shared resource (appears as `worker` on its events).
    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = name.into();
        self
    }

    /// Builds the host and spawns its subscriber listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Host {
        let bus = Bus::for_host(&self.cfg);
        let tracker = Arc::new(InFlightTracker::new());

        let mut subscribers = self.subscribers;
        subscribers.push(tracker.clone());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));

        let resource = Arc::new(SharedResource::new(self.resource_name).with_bus(bus.clone()));
        let listener = CancellationToken::new();
        let listener_task = subscriber_listener(&bus, Arc::clone(&subs), listener.clone());

        Host {
            cfg: self.cfg,
            bus,
            subs,
            tracker,
            resource,
            workers: Vec::new(),
            listener,
            listener_task,
        }
    }
}

/// Owns the workers and the shared resource; enforces stop → wait → dispose.
pub struct Host {
    cfg: HostConfig,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    tracker: Arc<InFlightTracker>,
    resource: Arc<SharedResource>,
    workers: Vec<Arc<PeriodicRunner>>,
    listener: CancellationToken,
    listener_task: JoinHandle<()>,
}

impl Host {
    /// Starts building a host.
    pub fn builder(cfg: HostConfig) -> HostBuilder {
        HostBuilder::new(cfg)
    }

    /// The shared resource; hand it to the workers' [`Ticker`](crate::Ticker)s.
    pub fn resource(&self) -> Arc<SharedResource> {
        Arc::clone(&self.resource)
    }

    /// Registered workers, in the order they were added.
    pub fn workers(&self) -> &[Arc<PeriodicRunner>] {
        &self.workers
    }

    /// Looks up a worker by name.
    pub fn worker(&self, name: &str) -> Option<&Arc<PeriodicRunner>> {
        self.workers.iter().find(|w| w.name() == name)
    }

    /// Registers a new idle worker publishing on the host bus.
    pub fn add_worker(
        &mut self,
        name: impl Into<Arc<str>>,
        work: WorkRef,
        cfg: RunnerConfig,
    ) -> Arc<PeriodicRunner> {
        let runner = Arc::new(PeriodicRunner::new(name, work, cfg, self.bus.clone()));
        self.workers.push(Arc::clone(&runner));
        runner
    }

    /// Starts every worker that is still `Idle`.
    pub fn start(&self) -> Result<(), RuntimeError> {
        for w in &self.workers {
            if w.state() == RunnerState::Idle {
                w.start()?;
            }
        }
        Ok(())
    }

    /// Stops every worker, waits for them to drain, then disposes the resource.
    ///
    /// With a non-zero [`HostConfig::grace`], gives up once it elapses and returns
    /// [`RuntimeError::GraceExceeded`]; the resource is **not** disposed then.
    pub async fn shutdown(&self) -> Result<ShutdownReport, RuntimeError> {
        self.shutdown_with_reason(None).await
    }

    /// Starts the workers, waits for `until`, then shuts down.
    pub async fn run_until<F: Future>(&self, until: F) -> Result<ShutdownReport, RuntimeError> {
        self.start()?;
        until.await;
        self.shutdown().await
    }

    /// Starts the workers, waits for a termination signal, then shuts down.
    pub async fn run_until_signal(&self) -> Result<ShutdownReport, RuntimeError> {
        self.start()?;
        // A failed signal registration still ends in an orderly shutdown.
        let reason = match shutdown::wait_for_shutdown_signal().await {
            Ok(signal) => signal,
            Err(_) => "signal_unavailable",
        };
        self.shutdown_with_reason(Some(reason)).await
    }

    /// Stops the subscriber listener and flushes every subscriber queue.
    ///
    /// Events published after this call are not delivered.
    pub async fn close(self) {
        self.listener.cancel();
        let _ = self.listener_task.await;
        if let Ok(set) = Arc::try_unwrap(self.subs) {
            set.shutdown().await;
        }
    }

    async fn shutdown_with_reason(
        &self,
        reason: Option<&'static str>,
    ) -> Result<ShutdownReport, RuntimeError> {
        let mut ev = Event::new(EventKind::ShutdownRequested);
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);

        for w in self.workers.iter().rev() {
            if matches!(w.state(), RunnerState::Running | RunnerState::StopRequested) {
                w.request_stop()?;
            }
        }

        let drain = async {
            for w in &self.workers {
                if w.state() != RunnerState::Idle {
                    w.wait_stopped().await?;
                }
            }
            Ok::<(), RunnerError>(())
        };
        match self.cfg.grace_limit() {
            None => drain.await?,
            Some(grace) => match time::timeout(grace, drain).await {
                Ok(res) => res?,
                Err(_) => {
                    let stuck = self.tracker.snapshot().await;
                    self.bus.publish(
                        Event::new(EventKind::GraceExceeded)
                            .with_delay(grace)
                            .with_in_flight(stuck.len() as u64)
                            .with_reason(stuck.join(",")),
                    );
                    return Err(RuntimeError::GraceExceeded { grace, stuck });
                }
            },
        }

        self.bus.publish(Event::new(EventKind::AllStoppedWithin));
        self.resource.dispose();
        Ok(self.report())
    }

    fn report(&self) -> ShutdownReport {
        ShutdownReport {
            workers: self
                .workers
                .iter()
                .map(|w| WorkerReport {
                    name: w.name().to_string(),
                    state: w.state(),
                    stats: w.stats(),
                })
                .collect(),
        }
    }
}

/// Forwards bus events to the subscriber set until `stop` fires, then drains
/// whatever the receiver still holds.
fn subscriber_listener(
    bus: &Bus,
    set: Arc<SubscriberSet>,
    stop: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            select! {
                biased;
                _ = stop.cancelled() => break,
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                },
            }
        }
        while let Ok(ev) = rx.try_recv() {
            set.emit(ev);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Dispatch, FirstTick};
    use crate::policies::StopPolicy;
    use crate::resource::{Ticker, TickerWork};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Record {
        events: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl Subscribe for Record {
        async fn on_event(&self, ev: &Event) {
            self.events.lock().unwrap().push(ev.clone());
        }
        fn name(&self) -> &'static str {
            "record"
        }
    }

    impl Record {
        fn kinds_seq(&self, kind: EventKind) -> Vec<u64> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.seq)
                .collect()
        }
    }

    fn ticker_cfg(policy: StopPolicy) -> RunnerConfig {
        RunnerConfig {
            interval: Duration::from_secs(1),
            dispatch: Dispatch::Concurrent { limit: 0 },
            first_tick: FirstTick::Immediate,
            stop_policy: policy,
            ..RunnerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_happens_after_every_worker_stopped() {
        let record = Arc::new(Record::default());
        let mut host = Host::builder(HostConfig::default())
            .with_subscribers(vec![record.clone()])
            .with_resource_name("ticker")
            .build();

        for (name, secs) in [("fast", 1), ("slow", 2)] {
            let work = TickerWork::arc(
                name,
                Ticker::new(host.resource()),
                Duration::from_secs(secs),
            );
            host.add_worker(name, work, ticker_cfg(StopPolicy::Drain));
        }

        let report = host
            .run_until(time::sleep(Duration::from_millis(2100)))
            .await
            .unwrap();
        let resource = host.resource();
        assert!(resource.is_disposed());

        let totals = report.totals();
        assert_eq!(totals.dispatched, 6);
        assert_eq!(totals.completed, 6);
        assert_eq!(totals.abandoned, 0);
        assert!(report.workers.iter().all(|w| w.state == RunnerState::Stopped));

        time::sleep(Duration::from_secs(5)).await;
        host.close().await;
        assert_eq!(resource.violations(), 0);

        let stopped = record.kinds_seq(EventKind::WorkerStopped);
        let disposed = record.kinds_seq(EventKind::ResourceDisposed);
        assert_eq!(stopped.len(), 2);
        assert_eq!(disposed.len(), 1);
        assert!(stopped.iter().all(|s| *s < disposed[0]));
        assert!(record.kinds_seq(EventKind::UsedAfterDisposal).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_exceeded_leaves_resource_active() {
        let cfg = HostConfig {
            grace: Duration::from_secs(1),
            ..HostConfig::default()
        };
        let mut host = Host::builder(cfg).build();
        let work = TickerWork::arc("slow", Ticker::new(host.resource()), Duration::from_secs(10));
        host.add_worker("slow", work, ticker_cfg(StopPolicy::Drain));

        let err = host
            .run_until(time::sleep(Duration::from_millis(500)))
            .await
            .unwrap_err();
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_secs(1));
                assert_eq!(stuck, vec!["slow#0".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!host.resource().is_disposed());

        // The unit still finishes against a live resource.
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(host.resource().accepted(), 1);
        assert_eq!(host.resource().last_accepted(), Some(0));
        assert_eq!(host.resource().violations(), 0);
        host.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_requested_last_added_first() {
        let record = Arc::new(Record::default());
        let mut host = Host::builder(HostConfig::default())
            .with_subscribers(vec![record.clone()])
            .build();

        for name in ["first", "second"] {
            let work = TickerWork::arc(name, Ticker::new(host.resource()), Duration::from_millis(10));
            host.add_worker(name, work, ticker_cfg(StopPolicy::Drain));
        }

        host.run_until(time::sleep(Duration::from_millis(500)))
            .await
            .unwrap();
        host.close().await;

        let stopping = |worker: &str| -> Vec<u64> {
            record
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.kind == EventKind::WorkerStopping && e.worker.as_deref() == Some(worker))
                .map(|e| e.seq)
                .collect()
        };
        let first = stopping("first");
        let second = stopping("second");
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert!(second[0] < first[0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_worker_races_disposal() {
        let mut host = Host::builder(HostConfig::default()).build();
        let work = TickerWork::arc("tick", Ticker::new(host.resource()), Duration::from_secs(1));
        host.add_worker("detached", work, ticker_cfg(StopPolicy::Detach));

        let report = host
            .run_until(time::sleep(Duration::from_millis(2500)))
            .await
            .unwrap();
        assert_eq!(report.totals().abandoned, 1);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(host.resource().violations(), 1);
        host.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_start_disposes_immediately() {
        let mut host = Host::builder(HostConfig::default()).build();
        let work = TickerWork::arc("tick", Ticker::new(host.resource()), Duration::from_secs(1));
        host.add_worker("never", work, RunnerConfig::default());

        let report = host.shutdown().await.unwrap();
        assert_eq!(report.workers[0].state, RunnerState::Idle);
        assert_eq!(report.totals(), RunnerStats::default());
        assert!(host.resource().is_disposed());
        host.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_skips_running_workers() {
        let mut host = Host::builder(HostConfig::default()).build();
        let a = TickerWork::arc("a", Ticker::new(host.resource()), Duration::from_millis(100));
        host.add_worker("a", a, RunnerConfig::default());
        host.start().unwrap();

        let b = TickerWork::arc("b", Ticker::new(host.resource()), Duration::from_millis(100));
        host.add_worker("b", b, RunnerConfig::default());
        host.start().unwrap();

        assert_eq!(host.worker("a").map(|w| w.state()), Some(RunnerState::Running));
        assert_eq!(host.worker("b").map(|w| w.state()), Some(RunnerState::Running));
        assert!(host.worker("c").is_none());

        host.shutdown().await.unwrap();
        host.close().await;
    }
}
