//! PointLedger - team point balances and item records
//!
//! This crate is the durable-record collaborator of the auction engine: team
//! balances and item records live here, and every balance mutation the engine
//! performs (escrow hold, refund, settlement) goes through one atomic ledger
//! operation.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod records;

pub use error::LedgerError;
pub use ledger::{EscrowSwap, Ledger, SharedLedger};
pub use memory::InMemoryLedger;
pub use records::{ItemRecord, TeamRecord};

pub type TeamId = String;
pub type ItemId = String;
pub type Points = u64;
pub type EpochMs = u64;

// Result type alias
pub type Result<T> = std::result::Result<T, LedgerError>;
