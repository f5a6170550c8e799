//! # Event subscribers for the tickvisor host.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling runtime events broadcast through the
//! [`Bus`](crate::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   PeriodicRunner ── publish(Event) ──► Bus ──► Host listener ──► SubscriberSet
//!                                                                     │
//!                                                    ┌────────────────┼──────────────┐
//!                                                    ▼                ▼              ▼
//!                                               LogWriter      InFlightTracker    Custom
//!                                               (tracing)     (stuck-tick state)
//! ```
//!
//! ## Subscriber types
//! - **Passive subscribers** observe and react to events (logging, alerts)
//! - **Stateful subscribers** maintain internal state based on events (InFlightTracker)

mod in_flight;
mod log;
mod set;
mod subscribe;

pub use in_flight::InFlightTracker;
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
