//! Runtime core: schedule, runners and the host.
//!
//! The public API of this module is [`PeriodicRunner`] (one periodic worker) and
//! [`Host`] (owner of the shared resource and of the shutdown ordering).
//!
//! Internal modules:
//! - [`schedule`]: the tick producer, completed by a token that never cancels consumers;
//! - [`state`]: runner lifecycle with checked transitions;
//! - [`runner`]: dispatches one unit per tick and applies the stop policy;
//! - [`host`]: stop → wait → dispose, bounded by the grace period;
//! - [`shutdown`]: cross-platform termination signal handling.

mod host;
mod runner;
mod schedule;
mod shutdown;
mod state;

pub use host::{Host, HostBuilder, ShutdownReport, WorkerReport};
pub use runner::{PeriodicRunner, RunnerStats};
pub use schedule::{Tick, TickSource};
pub use state::RunnerState;
