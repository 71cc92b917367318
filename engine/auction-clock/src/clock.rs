//! Core clock implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::{ClockError, RoundId};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// One periodic notification from the clock
///
/// `round` tags the auction round this tick was scheduled for; the engine
/// drops ticks from any other round, which makes a tick that was already
/// buffered when its round ended inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub round: RoundId,
    pub now_ms: u64,
}

pub struct AuctionClock;

impl AuctionClock {
    /// Spawn the tick task for one round.
    ///
    /// Ticks are sent as `T` so they can share a channel with whatever else
    /// the consumer serializes - the auction engine passes its own command
    /// type here. The task stops on cancel or when the sink closes.
    pub fn start<T>(
        round: RoundId,
        interval: Duration,
        sink: mpsc::UnboundedSender<T>,
    ) -> ClockHandle
    where
        T: From<ClockTick> + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn({
            let cancelled = cancelled.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                // interval's first tick completes immediately; the engine
                // already knows the state it just published, so skip it.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    let tick = ClockTick { round, now_ms: now_ms() };
                    if sink.send(T::from(tick)).is_err() {
                        debug!(round, "tick sink closed, clock stopping");
                        break;
                    }
                }
            }
        });

        ClockHandle { round, cancelled, task }
    }
}

/// Handle to a spawned clock task
pub struct ClockHandle {
    round: RoundId,
    cancelled: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl ClockHandle {
    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop the tick task. Synchronous: once this returns Ok, the task is
    /// flagged and aborted and will enqueue no further tick.
    pub fn cancel(&self) -> Result<(), ClockError> {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return Err(ClockError::AlreadyCancelled { round: self.round });
        }
        self.task.abort();
        Ok(())
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stands in for the engine's command type.
    #[derive(Debug)]
    enum TestCmd {
        Tick(ClockTick),
    }

    impl From<ClockTick> for TestCmd {
        fn from(tick: ClockTick) -> Self {
            TestCmd::Tick(tick)
        }
    }

    #[tokio::test]
    async fn ticks_carry_their_round() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TestCmd>();
        let clock = AuctionClock::start(7, Duration::from_millis(10), tx);

        let TestCmd::Tick(first) = rx.recv().await.expect("first tick");
        let TestCmd::Tick(second) = rx.recv().await.expect("second tick");
        assert_eq!(first.round, 7);
        assert_eq!(second.round, 7);
        assert!(second.now_ms >= first.now_ms);

        clock.cancel().unwrap();
    }

    #[tokio::test]
    async fn cancel_stops_delivery() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TestCmd>();
        let clock = AuctionClock::start(1, Duration::from_millis(10), tx);

        rx.recv().await.expect("at least one tick");
        clock.cancel().unwrap();
        assert!(clock.is_cancelled());

        // Drain anything that was in flight at cancel time, then the channel
        // must go quiet for good.
        tokio::time::sleep(Duration::from_millis(50)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn double_cancel_is_an_error() {
        let (tx, _rx) = mpsc::unbounded_channel::<TestCmd>();
        let clock = AuctionClock::start(3, Duration::from_millis(10), tx);

        clock.cancel().unwrap();
        assert_eq!(clock.cancel(), Err(ClockError::AlreadyCancelled { round: 3 }));
    }

    #[tokio::test]
    async fn clock_stops_when_sink_closes() {
        let (tx, rx) = mpsc::unbounded_channel::<TestCmd>();
        let _clock = AuctionClock::start(1, Duration::from_millis(10), tx);

        drop(rx);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(_clock.task.is_finished());
    }
}
