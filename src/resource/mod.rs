//! # Shared resource and the ticker work unit.
//!
//! - [`SharedResource`] - process-wide dependency with an irreversible disposed flag
//! - [`Ticker`] - reports a sequence number through the resource
//! - [`TickerWork`] - the [`Work`](crate::Work) body driven by a runner
//!
//! ```text
//! PeriodicRunner ──► TickerWork::run(seq) ──► Ticker::tick(seq) ──► SharedResource::invoke(seq)
//!                                                                         │
//!                                          Host ──► SharedResource::dispose() (after drain)
//! ```

mod shared;
mod ticker;

pub use shared::SharedResource;
pub use ticker::{Ticker, TickerWork};
