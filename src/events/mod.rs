//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the host, the periodic
//! runners, the shared resource and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Host`, `PeriodicRunner` (driver and unit tasks),
//!   `SharedResource`, `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Host::subscriber_listener()` (fans out to `SubscriberSet`,
//!   which includes the `InFlightTracker`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
