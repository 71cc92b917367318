//! Canonical events emitted by the auction engine
//!
//! Events leave the engine on one channel and reach every observer in
//! emission order. Per accepted bid the order is fixed: the bid update first,
//! then the extension notice if the anti-snipe rule fired.

use crate::{EpochMs, ItemId, Points, TeamId};

/// A round opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvStarted {
    pub item_id: ItemId,
    pub item_name: String,
    pub starting_price: Points,
    pub start_time: EpochMs,
    pub end_time: EpochMs,
    pub duration_ms: u64,
}

/// A bid was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvBidUpdate {
    pub item_id: ItemId,
    pub new_bid: Points,
    /// The highest bid this one displaced; 0 for the round's first bid.
    pub old_bid: Points,
    pub leader: TeamId,
    pub prior_leader: Option<TeamId>,
    pub timer_extended: bool,
    pub time_remaining_ms: u64,
    pub timestamp: EpochMs,
}

/// Periodic countdown notice, roughly 1 Hz while running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvTimerUpdate {
    pub item_id: ItemId,
    pub time_remaining_ms: u64,
    pub end_time: EpochMs,
}

/// The anti-snipe rule pushed the deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvTimerExtended {
    pub item_id: ItemId,
    pub new_end_time: EpochMs,
    pub added_ms: u64,
    pub time_remaining_ms: u64,
}

/// The round settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvEnded {
    pub item_id: ItemId,
    /// 0 when the round ended with no bids.
    pub winning_bid: Points,
    pub winner: Option<TeamId>,
    pub timestamp: EpochMs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuctionEvent {
    Started(EvStarted),
    BidUpdate(EvBidUpdate),
    TimerUpdate(EvTimerUpdate),
    TimerExtended(EvTimerExtended),
    Ended(EvEnded),
}

impl AuctionEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AuctionEvent::Started(_) => EventKind::Started,
            AuctionEvent::BidUpdate(_) => EventKind::BidUpdate,
            AuctionEvent::TimerUpdate(_) => EventKind::TimerUpdate,
            AuctionEvent::TimerExtended(_) => EventKind::TimerExtended,
            AuctionEvent::Ended(_) => EventKind::Ended,
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            AuctionEvent::Started(ev) => &ev.item_id,
            AuctionEvent::BidUpdate(ev) => &ev.item_id,
            AuctionEvent::TimerUpdate(ev) => &ev.item_id,
            AuctionEvent::TimerExtended(ev) => &ev.item_id,
            AuctionEvent::Ended(ev) => &ev.item_id,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EventKind {
    Started,
    BidUpdate,
    TimerUpdate,
    TimerExtended,
    Ended,
}
