//! # Work abstraction.
//!
//! This module defines the [`Work`] trait, one unit of periodic work, and the
//! shared handle type [`WorkRef`].
//!
//! A unit receives the tick sequence number and a [`CancellationToken`] that is
//! cancelled when the owning runner is asked to stop. Units check it at entry
//! only: once the body started, it runs to completion.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;

/// Shared handle to a unit of work.
pub type WorkRef = Arc<dyn Work>;

/// # Asynchronous unit of periodic work.
///
/// A `Work` has a stable [`name`](Work::name) and an async [`run`](Work::run)
/// method invoked once per tick.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use tickvisor::{Work, WorkError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Work for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, tick: u64, ctx: CancellationToken) -> Result<(), WorkError> {
///         if ctx.is_cancelled() {
///             return Err(WorkError::Canceled);
///         }
///         let _ = tick;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Returns a stable, human-readable name.
    fn name(&self) -> &str;

    /// Executes the unit for tick `tick`.
    ///
    /// Returning [`WorkError::Canceled`] means the body was skipped because stop
    /// had already been requested; the runner reports it as skipped, not failed.
    async fn run(&self, tick: u64, ctx: CancellationToken) -> Result<(), WorkError>;
}
