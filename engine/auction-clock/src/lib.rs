//! AuctionClock - the heartbeat of a running auction round
//!
//! One clock task exists per round. It pushes ticks into the same channel the
//! engine reads bids from, so timer expiry and bid processing can never
//! interleave. The clock carries no deadline: the engine judges expiry
//! against its own `end_time`, which is what lets anti-snipe extensions move
//! the deadline without rescheduling anything here.

mod clock;
mod error;

pub use clock::{now_ms, AuctionClock, ClockHandle, ClockTick};
pub use error::ClockError;

pub type RoundId = u64;

/// Default tick granularity: one second.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
