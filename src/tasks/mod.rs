//! # Work abstractions.
//!
//! This module provides the work-related types:
//! - [`Work`] - trait for one unit of periodic work
//! - [`WorkFn`] - closure-based implementation
//! - [`WorkRef`] - shared reference to work (`Arc<dyn Work>`)

mod work;
mod work_fn;

pub use work::{Work, WorkRef};
pub use work_fn::WorkFn;
