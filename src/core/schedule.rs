//! # Tick source: the repeating schedule.
//!
//! [`TickSource`] spawns a producer over [`tokio::time::interval_at`] that sends
//! numbered [`Tick`]s into a bounded channel. The producer listens to a
//! **completion token** only: completing the source ends the stream (after any
//! buffered ticks) and never cancels whoever consumes it.
//!
//! ```text
//! interval ──► producer ──► [mpsc, tick_buffer] ──► consumer (PeriodicRunner driver)
//!                 ▲
//!          completion token ── cancel() ──► producer exits ──► sender dropped ──► next() = None
//! ```
//!
//! ## Rules
//! - Sequence numbers start at 0 and increase by one per delivered tick
//! - A full buffer holds the producer back; missed periods are skipped, not burst
//! - Completion is the only way the stream ends

use std::time::Duration;

use tokio::{
    select,
    sync::mpsc,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::config::FirstTick;

/// One schedule event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Sequence number (0, 1, 2, ...).
    pub seq: u64,
    /// Scheduled instant of this tick.
    pub at: Instant,
}

/// Receiving end of a running schedule.
pub struct TickSource {
    rx: mpsc::Receiver<Tick>,
    done: CancellationToken,
}

impl TickSource {
    /// Spawns the producer and returns the receiving end.
    ///
    /// Cancelling `done` completes the source. Must be called from within a tokio runtime.
    pub fn spawn(
        period: Duration,
        first: FirstTick,
        buffer: usize,
        done: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        tokio::spawn(produce(tx, period, first, done.clone()));
        Self { rx, done }
    }

    /// Receives the next tick; `None` once the source completed and the buffer is empty.
    pub async fn next(&mut self) -> Option<Tick> {
        self.rx.recv().await
    }

    /// Completes the source. Idempotent.
    pub fn complete(&self) {
        self.done.cancel();
    }
}

async fn produce(
    tx: mpsc::Sender<Tick>,
    period: Duration,
    first: FirstTick,
    done: CancellationToken,
) {
    let start = match first {
        FirstTick::Immediate => Instant::now(),
        FirstTick::AfterInterval => Instant::now() + period,
    };
    let mut timer = time::interval_at(start, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut seq: u64 = 0;
    loop {
        let at = select! {
            biased;
            _ = done.cancelled() => break,
            at = timer.tick() => at,
        };
        select! {
            biased;
            _ = done.cancelled() => break,
            sent = tx.send(Tick { seq, at }) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_immediate_ticks_are_numbered_from_zero() {
        let started = Instant::now();
        let mut src = TickSource::spawn(
            Duration::from_secs(1),
            FirstTick::Immediate,
            1,
            CancellationToken::new(),
        );

        for expected in 0..3u64 {
            let tick = src.next().await.unwrap();
            assert_eq!(tick.seq, expected);
            assert_eq!(tick.at - started, Duration::from_secs(expected));
        }
        src.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_interval_delays_first_tick() {
        let started = Instant::now();
        let mut src = TickSource::spawn(
            Duration::from_secs(1),
            FirstTick::AfterInterval,
            1,
            CancellationToken::new(),
        );
        let tick = src.next().await.unwrap();
        assert_eq!(tick.seq, 0);
        assert_eq!(tick.at - started, Duration::from_secs(1));
        src.complete();
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_ends_stream() {
        let done = CancellationToken::new();
        let mut src = TickSource::spawn(
            Duration::from_millis(100),
            FirstTick::Immediate,
            1,
            done.clone(),
        );
        assert_eq!(src.next().await.map(|t| t.seq), Some(0));

        done.cancel();
        // At most the one buffered tick may still be delivered.
        let mut rest = 0;
        while src.next().await.is_some() {
            rest += 1;
        }
        assert!(rest <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_buffer_holds_producer_back() {
        let mut src = TickSource::spawn(
            Duration::from_millis(100),
            FirstTick::Immediate,
            1,
            CancellationToken::new(),
        );
        time::sleep(Duration::from_secs(5)).await;

        // No backlog of fifty ticks: the sequence continues without gaps.
        let a = src.next().await.unwrap();
        let b = src.next().await.unwrap();
        let c = src.next().await.unwrap();
        assert_eq!((a.seq, b.seq, c.seq), (0, 1, 2));
        src.complete();
    }
}
