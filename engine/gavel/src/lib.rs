// Gavel - serialized single-item live auction engine

mod commands;
mod config;
mod engine;
mod error;
mod events;
mod state;
mod validator;

pub use commands::{BidReceipt, Command, SettlementSummary, StartAuction, StartedSummary};
pub use config::AuctionCfg;
pub use engine::{AuctionEngine, EngineHandle};
pub use error::AuctionError;
pub use events::{
    AuctionEvent, EvBidUpdate, EvEnded, EvStarted, EvTimerExtended, EvTimerUpdate, EventKind,
};
pub use state::{ActiveAuction, RunningStatus, StatusSnapshot};
pub use validator::{validate, BidRequest};

pub use auction_clock::RoundId;
pub use point_ledger::{EpochMs, ItemId, Points, TeamId};
