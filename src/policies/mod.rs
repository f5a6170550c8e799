//! Shutdown policies.
//!
//! This module groups the knob that controls **what happens to in-flight work**
//! when a runner is asked to stop.
//!
//! ## Contents
//! - [`StopPolicy`] drain (correct) / detach / cancel-await (both broken on purpose)
//!
//! ## Quick wiring
//! ```text
//! RunnerConfig { stop_policy: StopPolicy, .. }
//!      └─► core::runner::PeriodicRunner uses:
//!           - stop_policy to decide whether the driver drains or abandons in-flight units
//!           - stop_policy to decide who flips the state to Stopped
//! ```

mod stop;

pub use stop::StopPolicy;
