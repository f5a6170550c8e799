//! # Ticker and its work unit.
//!
//! [`Ticker`] is the useful work: it reports a sequence number through the
//! [`SharedResource`]. [`TickerWork`] wraps it into a [`Work`] with a simulated,
//! non-cancellable delay in front of the call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{ResourceError, WorkError};
use crate::resource::SharedResource;
use crate::tasks::Work;

/// Reports sequence numbers through a shared resource.
#[derive(Clone, Debug)]
pub struct Ticker {
    resource: Arc<SharedResource>,
}

impl Ticker {
    /// Creates a ticker over `resource` (non-owning: the host disposes it).
    pub fn new(resource: Arc<SharedResource>) -> Self {
        Self { resource }
    }

    /// Reports `seq`. A disposal failure is returned unchanged.
    pub fn tick(&self, seq: u64) -> Result<(), ResourceError> {
        self.resource.invoke(seq)
    }
}

/// Work unit: entry check, uninterruptible delay, then [`Ticker::tick`].
pub struct TickerWork {
    name: String,
    ticker: Ticker,
    duration: Duration,
}

impl TickerWork {
    /// Creates a unit named `name` that takes `duration` before ticking.
    pub fn new(name: impl Into<String>, ticker: Ticker, duration: Duration) -> Self {
        Self {
            name: name.into(),
            ticker,
            duration,
        }
    }

    /// Creates the unit and returns it as a shared handle.
    pub fn arc(name: impl Into<String>, ticker: Ticker, duration: Duration) -> Arc<Self> {
        Arc::new(Self::new(name, ticker, duration))
    }
}

#[async_trait]
impl Work for TickerWork {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, tick: u64, ctx: CancellationToken) -> Result<(), WorkError> {
        if ctx.is_cancelled() {
            return Err(WorkError::Canceled);
        }
        // Not raced against `ctx`: this models I/O that cannot be interrupted.
        tokio::time::sleep(self.duration).await;
        self.ticker.tick(tick)?;
        Ok(())
    }
}
