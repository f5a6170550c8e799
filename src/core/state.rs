//! # Runner lifecycle state.
//!
//! ```text
//! Idle ──start()──► Running ──request_stop()──► StopRequested ──(drain done)──► Stopped
//! ```
//!
//! [`StateCell`] stores the state in a `tokio::sync::watch` channel so that
//! transitions are atomic compare-and-set operations and waiters can park on
//! [`StateCell::wait_for`] without polling.

use tokio::sync::watch;

/// Lifecycle state of a [`PeriodicRunner`](crate::PeriodicRunner).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerState {
    /// Created, schedule not started.
    Idle,
    /// Schedule running, units being dispatched.
    Running,
    /// Stop requested; no new units, in-flight units may still run.
    StopRequested,
    /// Terminal.
    Stopped,
}

/// Watch-backed state holder with checked transitions.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<RunnerState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(RunnerState::Idle);
        Self { tx }
    }

    pub(crate) fn get(&self) -> RunnerState {
        *self.tx.borrow()
    }

    /// Moves to `to` if the current state is one of `from`.
    ///
    /// Returns the previous state, or the observed state when the transition was refused.
    pub(crate) fn transition(
        &self,
        from: &[RunnerState],
        to: RunnerState,
    ) -> Result<RunnerState, RunnerState> {
        let mut outcome = Err(RunnerState::Idle);
        self.tx.send_if_modified(|state| {
            if from.contains(state) {
                outcome = Ok(*state);
                *state = to;
                true
            } else {
                outcome = Err(*state);
                false
            }
        });
        outcome
    }

    /// Resolves once the state equals `target`.
    pub(crate) async fn wait_for(&self, target: RunnerState) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we borrow it.
        let _ = rx.wait_for(|state| *state == target).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_checked_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), RunnerState::Idle);

        assert_eq!(
            cell.transition(&[RunnerState::Idle], RunnerState::Running),
            Ok(RunnerState::Idle)
        );
        assert_eq!(
            cell.transition(&[RunnerState::Idle], RunnerState::Running),
            Err(RunnerState::Running)
        );
        assert_eq!(
            cell.transition(
                &[RunnerState::Running, RunnerState::StopRequested],
                RunnerState::Stopped
            ),
            Ok(RunnerState::Running)
        );
        assert_eq!(cell.get(), RunnerState::Stopped);
    }

    #[tokio::test]
    async fn test_wait_for_wakes_on_transition() {
        let cell = Arc::new(StateCell::new());
        let waiter = tokio::spawn({
            let cell = Arc::clone(&cell);
            async move { cell.wait_for(RunnerState::Stopped).await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        cell.transition(&[RunnerState::Idle], RunnerState::Stopped)
            .unwrap();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_current_state_returns_immediately() {
        let cell = StateCell::new();
        cell.wait_for(RunnerState::Idle).await;
    }
}
