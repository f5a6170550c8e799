//! # tickvisor
//!
//! **Tickvisor** runs periodic async work inside a tokio service and shuts it down
//! without racing the resources that work depends on.
//!
//! A [`PeriodicRunner`] dispatches one unit of [`Work`] per tick. Units are never
//! cancelled mid-flight: stopping a runner ends its schedule, and the runner only
//! reports `Stopped` once every unit started before the stop has finished. The
//! [`Host`] owns the [`SharedResource`] those units call and disposes it strictly
//! after all runners stopped.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ RunnerConfig │   │ RunnerConfig │   │ RunnerConfig │
//!     │  + Work #1   │   │  + Work #2   │   │  + Work #3   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Host (lifecycle owner)                                           │
//! │  - Bus (broadcast events)                                         │
//! │  - InFlightTracker (running ticks, by sequence number)            │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - SharedResource (disposed last)                                 │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐        │
//!  │PeriodicRunner│  │PeriodicRunner│  │PeriodicRunner│        │
//!  │ TickSource   │  │ TickSource   │  │ TickSource   │        │
//!  │  └► units    │  │  └► units    │  │  └► units    │        │
//!  └┬─────────────┘  └┬─────────────┘  └┬─────────────┘        │
//!   │ WorkStarting    │ TickReceived    │ WorkerStopped        │
//!   │ WorkCompleted   │ TickDropped     │ WorkAbandoned        │
//!   ▼                 ▼                 ▼                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! │                 (capacity: HostConfig::bus_capacity)              │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │       (in Host)        │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                  ┌────────────────┼────────────────┐
//!                  ▼                ▼                ▼
//!            InFlightTracker    LogWriter          custom
//! ```
//!
//! ### Lifecycle
//! ```text
//! Host::start() ──► PeriodicRunner::start()      Idle ─► Running
//!
//! driver loop {
//!   ├─► wait for a free slot (Dispatch)
//!   ├─► tick = TickSource::next()               (None once completed)
//!   ├─► stop already requested? ─► TickDropped, exit
//!   └─► spawn unit: Work::run(tick, stop_token)
//!          ├─ Ok            ─► WorkCompleted
//!          ├─ Err(Canceled) ─► WorkSkipped      (stop seen at entry)
//!          └─ Err / panic   ─► WorkFailed       (schedule keeps going)
//! }
//!
//! Host::shutdown()
//!   ├─► request_stop() on every runner           Running ─► StopRequested
//!   ├─► wait_stopped() on every runner           StopRequested ─► Stopped (after drain)
//!   └─► SharedResource::dispose()                never before the line above
//! ```
//!
//! ## Features
//! | Area              | Description                                                    | Key types / traits                          |
//! |-------------------|----------------------------------------------------------------|---------------------------------------------|
//! | **Runners**       | Periodic dispatch with drain-on-stop.                          | [`PeriodicRunner`], [`RunnerState`]         |
//! | **Host**          | Stop → wait → dispose ordering with a grace bound.             | [`Host`], [`ShutdownReport`]                |
//! | **Resource**      | Disposable dependency that detects use after disposal.         | [`SharedResource`], [`Ticker`]              |
//! | **Policies**      | The correct stop policy and two broken ones for comparison.    | [`StopPolicy`], [`WorkerVariant`]           |
//! | **Subscriber API**| Hook into runner and resource events.                          | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | Typed errors for hosts, runners, resources and units.          | [`RuntimeError`], [`WorkError`]             |
//! | **Configuration** | Plain structs with sentinel-aware accessors.                   | [`HostConfig`], [`RunnerConfig`]            |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{Host, HostConfig, LogWriter, RunnerConfig, Subscribe, WorkError, WorkFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let mut host = Host::builder(HostConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let resource = host.resource();
//!     let work = WorkFn::arc("report", move |tick: u64, ctx: CancellationToken| {
//!         let resource = resource.clone();
//!         async move {
//!             if ctx.is_cancelled() {
//!                 return Err(WorkError::Canceled);
//!             }
//!             tokio::time::sleep(Duration::from_millis(5)).await;
//!             resource.invoke(tick)?;
//!             Ok(())
//!         }
//!     });
//!
//!     let mut cfg = RunnerConfig::default();
//!     cfg.interval = Duration::from_millis(10);
//!     host.add_worker("reporter", work, cfg);
//!
//!     let report = host
//!         .run_until(tokio::time::sleep(Duration::from_millis(35)))
//!         .await?;
//!     assert_eq!(report.totals().in_flight(), 0);
//!     assert_eq!(host.resource().violations(), 0);
//!
//!     host.close().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod policies;
mod resource;
mod subscribers;
mod tasks;
mod variants;

// ---- Public re-exports ----

pub use config::{Dispatch, FirstTick, HostConfig, RunnerConfig};
pub use core::{
    Host, HostBuilder, PeriodicRunner, RunnerState, RunnerStats, ShutdownReport, Tick, TickSource,
    WorkerReport,
};
pub use error::{ResourceError, RunnerError, RuntimeError, WorkError};
pub use events::{Bus, Event, EventKind};
pub use policies::StopPolicy;
pub use resource::{SharedResource, Ticker, TickerWork};
pub use subscribers::{InFlightTracker, LogWriter, Subscribe, SubscriberSet};
pub use tasks::{Work, WorkFn, WorkRef};
pub use variants::WorkerVariant;
