//! # Function-backed work (`WorkFn`)
//!
//! [`WorkFn`] wraps a closure `F: Fn(u64, CancellationToken) -> Fut`, producing a
//! fresh future per tick. Shared state must be captured explicitly as `Arc<...>`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use tickvisor::{WorkFn, WorkRef, WorkError};
//!
//! let w: WorkRef = WorkFn::arc("printer", |tick: u64, ctx: CancellationToken| async move {
//!     if ctx.is_cancelled() {
//!         return Err(WorkError::Canceled);
//!     }
//!     println!("tick {tick}");
//!     Ok(())
//! });
//!
//! assert_eq!(w.name(), "printer");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkError;
use crate::tasks::work::Work;

/// Function-backed work implementation.
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates new function-backed work.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the work and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(u64, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), WorkError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, tick: u64, ctx: CancellationToken) -> Result<(), WorkError> {
        (self.f)(tick, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_receives_tick_and_token() {
        let w = WorkFn::arc("echo", |tick: u64, ctx: CancellationToken| async move {
            if ctx.is_cancelled() {
                return Err(WorkError::Canceled);
            }
            if tick % 2 == 1 {
                return Err(WorkError::Fail {
                    error: format!("odd {tick}"),
                });
            }
            Ok(())
        });

        let token = CancellationToken::new();
        assert_eq!(w.run(2, token.clone()).await, Ok(()));
        assert_eq!(
            w.run(3, token.clone()).await,
            Err(WorkError::Fail {
                error: "odd 3".into()
            })
        );
        token.cancel();
        assert_eq!(w.run(4, token).await, Err(WorkError::Canceled));
    }
}
