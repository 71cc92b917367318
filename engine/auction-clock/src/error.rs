//! Error types for AuctionClock

use crate::RoundId;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    #[error("clock for round {round} was already cancelled")]
    AlreadyCancelled { round: RoundId },
}
