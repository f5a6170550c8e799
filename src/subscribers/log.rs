//! # LogWriter — events as `tracing` records
//!
//! A subscriber that turns every incoming [`Event`] into a structured
//! [`tracing`] record. Install any `tracing` subscriber (e.g. `tracing-subscriber`
//! with `EnvFilter`) to see them.
//!
//! ## Levels
//! - `error`: `WorkFailed`, `UsedAfterDisposal`, `SubscriberPanicked`
//! - `warn`: `WorkAbandoned`, `GraceExceeded`, `SubscriberOverflow`
//! - `info`: worker lifecycle, shutdown, disposal
//! - `debug`: ticks and per-unit progress
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  worker starting worker="rx-worker" interval_ms=1000
//! DEBUG tick received worker="rx-worker" tick=0
//! INFO  worker stopping worker="rx-worker" in_flight=1 policy="drain"
//! INFO  worker stopped worker="rx-worker" in_flight=0
//! INFO  resource disposed resource="ticker"
//! ERROR dependency is called after disposal resource="ticker" tick=3
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::WorkerStarting => {
                info!(worker, interval_ms = e.delay_ms, "worker starting");
            }
            EventKind::WorkerStopping => {
                info!(worker, in_flight = e.in_flight, policy = reason, "worker stopping");
            }
            EventKind::WorkerStopped => {
                info!(worker, in_flight = e.in_flight, "worker stopped");
            }
            EventKind::TickReceived => {
                debug!(worker, tick = e.tick, "tick received");
            }
            EventKind::TickDropped => {
                debug!(worker, tick = e.tick, "tick dropped after stop request");
            }
            EventKind::WorkStarting => {
                debug!(worker, tick = e.tick, "work starting");
            }
            EventKind::WorkCompleted => {
                debug!(worker, tick = e.tick, "work completed");
            }
            EventKind::WorkSkipped => {
                debug!(worker, tick = e.tick, "work skipped: stop already requested");
            }
            EventKind::WorkFailed => {
                error!(worker, tick = e.tick, error = reason, "work failed");
            }
            EventKind::WorkAbandoned => {
                warn!(worker, in_flight = e.in_flight, "stopped without draining in-flight work");
            }
            EventKind::ShutdownRequested => {
                info!(signal = e.reason.as_deref(), "shutdown requested");
            }
            EventKind::AllStoppedWithin => {
                info!("all workers drained");
            }
            EventKind::GraceExceeded => {
                warn!(grace_ms = e.delay_ms, stuck = reason, "shutdown grace exceeded");
            }
            EventKind::ResourceDisposed => {
                info!(resource = worker, "resource disposed");
            }
            EventKind::UsedAfterDisposal => {
                error!(resource = worker, tick = e.tick, "dependency is called after disposal");
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = worker, reason, "subscriber dropped event");
            }
            EventKind::SubscriberPanicked => {
                error!(subscriber = worker, info = reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
