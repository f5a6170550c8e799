//! # Event bus shared by a host, its runners and its resource.
//!
//! One [`Bus`] exists per [`Host`](crate::Host), sized by
//! [`HostConfig::bus_capacity`](crate::HostConfig::bus_capacity). Runners and the
//! shared resource stamp their name on every event through [`Bus::publish_from`];
//! the host publishes its own shutdown events unstamped.
//!
//! ```text
//!   PeriodicRunner ── publish_from(name, ev) ──┐
//!   SharedResource ── publish_from(name, ev) ──┼──► broadcast ──► Host listener ──► SubscriberSet
//!   Host           ── publish(ev) ─────────────┘    (ring of bus_capacity events)
//! ```
//!
//! ## Rules
//! - Publishing never waits: a runner's driver or a work unit must not stall on observers
//! - No receivers means the event is dropped
//! - A receiver that falls more than `capacity` events behind sees `RecvError::Lagged`
//!   and skips the oldest ones; the host listener just continues

use std::sync::Arc;

use tokio::sync::broadcast;

use super::event::Event;
use crate::config::HostConfig;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (min 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Creates the bus of a host.
    pub fn for_host(cfg: &HostConfig) -> Self {
        Self::new(cfg.bus_capacity_clamped())
    }

    /// Publishes an event as is.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Publishes an event stamped with the name of the runner or resource that produced it.
    pub fn publish_from(&self, source: impl Into<Arc<str>>, ev: Event) {
        self.publish(ev.with_worker(source));
    }

    /// Creates a receiver that observes events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
