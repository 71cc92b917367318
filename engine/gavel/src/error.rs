//! Error types for the auction engine
//!
//! Every kind here is request-local: the caller that triggered it gets the
//! rejection, nobody else hears about it. `Ledger` deliberately carries no
//! detail - internal faults are logged and counted, not exported.

use crate::{ItemId, Points, TeamId};
use point_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("another auction is already running for item {item_id}")]
    Conflict { item_id: ItemId },

    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    #[error("team not found: {team_id}")]
    TeamNotFound { team_id: TeamId },

    #[error("item already settled: {item_id}")]
    AlreadySettled { item_id: ItemId },

    #[error("no active auction")]
    NoActiveAuction,

    #[error("insufficient points: bid {required}, available {available}")]
    InsufficientFunds { required: Points, available: Points },

    #[error("bid {bid} is too low, must exceed {minimum}")]
    BidTooLow { bid: Points, minimum: Points },

    #[error("ledger operation failed")]
    Ledger,

    #[error("auction engine is not running")]
    EngineClosed,
}

impl AuctionError {
    /// Stable machine-readable code, used as the `reason` field of bid
    /// rejections on the wire.
    pub fn reason(&self) -> &'static str {
        match self {
            AuctionError::Conflict { .. } => "auction_conflict",
            AuctionError::ItemNotFound { .. } => "item_not_found",
            AuctionError::TeamNotFound { .. } => "team_not_found",
            AuctionError::AlreadySettled { .. } => "item_already_settled",
            AuctionError::NoActiveAuction => "no_active_auction",
            AuctionError::InsufficientFunds { .. } => "insufficient_funds",
            AuctionError::BidTooLow { .. } => "bid_too_low",
            AuctionError::Ledger => "internal_error",
            AuctionError::EngineClosed => "engine_unavailable",
        }
    }
}

impl From<LedgerError> for AuctionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TeamNotFound { team_id } => AuctionError::TeamNotFound { team_id },
            LedgerError::ItemNotFound { item_id } => AuctionError::ItemNotFound { item_id },
            LedgerError::InsufficientPoints { required, available } => {
                AuctionError::InsufficientFunds { required, available }
            }
            LedgerError::AlreadySettled { item_id } => AuctionError::AlreadySettled { item_id },
            LedgerError::DuplicateTeam { .. }
            | LedgerError::DuplicateItem { .. }
            | LedgerError::ZeroPoints => AuctionError::Ledger,
        }
    }
}
