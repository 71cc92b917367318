//! Typed commands entering the engine's serialized channel
//!
//! Every mutating operation - start, bid, administrative end, and the
//! clock's ticks - arrives here and executes one at a time in arrival order.

use crate::{AuctionError, EpochMs, ItemId, Points, RoundId, TeamId};
use auction_clock::ClockTick;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartAuction {
    pub item_id: ItemId,
    /// None uses the configured default duration.
    pub duration_ms: Option<u64>,
}

/// Reply to a successful start command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSummary {
    pub round: RoundId,
    pub item_id: ItemId,
    pub item_name: String,
    pub starting_price: Points,
    pub duration_ms: u64,
    pub end_time: EpochMs,
}

/// Reply to the bidder whose bid was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidReceipt {
    pub item_id: ItemId,
    pub amount: Points,
    /// The bidder's balance after the hold.
    pub new_balance: Points,
    pub timer_extended: bool,
    pub end_time: EpochMs,
}

/// Reply to an end command; also what settlement records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementSummary {
    pub item_id: ItemId,
    pub item_name: String,
    pub winner: Option<TeamId>,
    /// 0 when the round ended with no bids.
    pub winning_bid: Points,
    pub settled_at: EpochMs,
}

pub enum Command {
    Start {
        request: StartAuction,
        reply: oneshot::Sender<Result<StartedSummary, AuctionError>>,
    },
    Bid {
        team_id: TeamId,
        amount: Points,
        reply: oneshot::Sender<Result<BidReceipt, AuctionError>>,
    },
    End {
        reply: oneshot::Sender<Result<SettlementSummary, AuctionError>>,
    },
    Tick(ClockTick),
}

// Lets the clock push ticks straight into the command channel.
impl From<ClockTick> for Command {
    fn from(tick: ClockTick) -> Self {
        Command::Tick(tick)
    }
}
