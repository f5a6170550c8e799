//! Error types used by the tickvisor runtime, runners and work units.
//!
//! This module defines four error enums:
//!
//! - [`RuntimeError`] — errors raised by the [`Host`](crate::Host) during shutdown.
//! - [`RunnerError`] — misuse of the [`PeriodicRunner`](crate::PeriodicRunner) control API.
//! - [`ResourceError`] — failures of the [`SharedResource`](crate::SharedResource).
//! - [`WorkError`] — the outcome of a single work unit.
//!
//! All types provide `as_label` for logging/metrics.

use std::time::Duration;
use thiserror::Error;

use crate::core::RunnerState;

/// # Errors produced by the host runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A runner rejected a lifecycle call issued by the host.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// Workers did not drain within the configured grace period.
    ///
    /// The shared resource is left active when this happens.
    #[error("shutdown grace {grace:?} exceeded; ticks still in flight: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// `worker#tick` labels of units that had not finished.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Runner(e) => e.as_label(),
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Misuse of the runner control API.
///
/// These are programmer errors; they are returned immediately and never block.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// `start()` was called on a runner that already left `Idle`.
    #[error("runner '{runner}' already started")]
    DoubleStart {
        /// Runner name.
        runner: String,
    },

    /// A control call is not valid in the runner's current state.
    #[error("runner '{runner}': cannot {op} while {from:?}")]
    InvalidStateTransition {
        /// Runner name.
        runner: String,
        /// State observed when the call was made.
        from: RunnerState,
        /// Name of the rejected operation.
        op: &'static str,
    },
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::DoubleStart { .. } => "runner_double_start",
            RunnerError::InvalidStateTransition { .. } => "runner_invalid_transition",
        }
    }
}

/// # Errors produced by the shared resource.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The resource was invoked after [`dispose`](crate::SharedResource::dispose).
    #[error("resource '{resource}' used after disposal")]
    UsedAfterDisposal {
        /// Resource name.
        resource: String,
    },
}

impl ResourceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ResourceError::UsedAfterDisposal { .. } => "resource_used_after_disposal",
        }
    }
}

/// # Outcome of a failed or skipped work unit.
///
/// Failures are isolated per unit: the runner reports them and keeps scheduling.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkError {
    /// The shared resource rejected the call.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The unit failed locally.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The unit saw the stop flag at entry and did not run its body.
    #[error("stop requested before the unit started")]
    Canceled,
}

impl WorkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tickvisor::WorkError;
    ///
    /// let err = WorkError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "work_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkError::Resource(e) => e.as_label(),
            WorkError::Fail { .. } => "work_failed",
            WorkError::Canceled => "work_canceled",
        }
    }

    /// True if this error proves the shutdown ordering was violated.
    pub fn is_disposal_violation(&self) -> bool {
        matches!(
            self,
            WorkError::Resource(ResourceError::UsedAfterDisposal { .. })
        )
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(any: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_converts_into_work_error() {
        let err: WorkError = ResourceError::UsedAfterDisposal {
            resource: "ticker".into(),
        }
        .into();
        assert!(err.is_disposal_violation());
        assert_eq!(err.as_label(), "resource_used_after_disposal");
        assert_eq!(err.to_string(), "resource 'ticker' used after disposal");
    }

    #[test]
    fn test_local_failure_is_not_a_violation() {
        assert!(!WorkError::Fail { error: "x".into() }.is_disposal_violation());
        assert!(!WorkError::Canceled.is_disposal_violation());
    }

    #[test]
    fn test_runner_error_labels() {
        let err = RunnerError::InvalidStateTransition {
            runner: "w".into(),
            from: RunnerState::Idle,
            op: "request_stop",
        };
        assert_eq!(err.as_label(), "runner_invalid_transition");
        assert_eq!(err.to_string(), "runner 'w': cannot request_stop while Idle");

        let rt: RuntimeError = RunnerError::DoubleStart { runner: "w".into() }.into();
        assert_eq!(rt.as_label(), "runner_double_start");
    }
}
