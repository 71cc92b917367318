//! The Ledger trait - the boundary between the auction engine and storage
//!
//! Every operation is a short critical section against the backing store.
//! Compound operations (`swap_escrow`) are atomic: they either apply fully
//! or leave every balance untouched.

use crate::{EpochMs, ItemRecord, Points, Result, TeamId, TeamRecord};
use std::sync::Arc;

/// A refund-then-hold pair applied as a single transaction
///
/// Refunding the displaced leader before placing the new hold is what keeps
/// an outbid team from ever losing points to a bid that did not win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowSwap {
    /// Prior leader to refund, with the amount they had held. None on the
    /// first accepted bid of a round.
    pub refund: Option<(TeamId, Points)>,
    /// New leader and the amount to hold against them.
    pub hold: (TeamId, Points),
}

pub trait Ledger: Send + Sync {
    fn team(&self, team_id: &str) -> Result<TeamRecord>;
    fn item(&self, item_id: &str) -> Result<ItemRecord>;

    /// All teams, highest balance first.
    fn teams_by_points(&self) -> Vec<TeamRecord>;

    /// Items with no winner yet, available for a future round.
    fn available_items(&self) -> Vec<ItemRecord>;

    /// Settled items, most recent settlement first.
    fn settled_items(&self) -> Vec<ItemRecord>;

    /// Atomically refund the displaced leader (if any) and hold the new
    /// leader's bid. Returns the holding team's balance after the hold.
    ///
    /// Fails without side effects if the holding team is unknown or cannot
    /// cover the hold after any refund is applied.
    fn swap_escrow(&self, swap: &EscrowSwap) -> Result<Points>;

    /// Commit a finished auction onto the item record: final price, winner,
    /// settlement time. The winner's escrow is the purchase price and is not
    /// refunded. Refuses to settle an item twice.
    fn commit_sale(
        &self,
        item_id: &str,
        winner: &str,
        price: Points,
        settled_at: EpochMs,
    ) -> Result<()>;

    fn create_team(&self, team: TeamRecord) -> Result<()>;
    fn create_item(&self, item: ItemRecord) -> Result<()>;

    /// Administrative grant. `points` must be positive.
    fn award_points(&self, team_id: &str, points: Points) -> Result<Points>;

    /// Administrative deduction. Refuses to overdraw.
    fn deduct_points(&self, team_id: &str, points: Points) -> Result<Points>;
}

pub type SharedLedger = Arc<dyn Ledger>;
