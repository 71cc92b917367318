//! Team and item records

use crate::{EpochMs, ItemId, Points, TeamId};
use serde::{Deserialize, Serialize};

/// A team participating in the auction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    pub members: Vec<String>,
    /// Point balance. Unsigned, so it can never go negative.
    pub points: Points,
}

impl TeamRecord {
    pub fn new(id: impl Into<TeamId>, name: impl Into<String>, members: Vec<String>) -> Self {
        Self { id: id.into(), name: name.into(), members, points: 0 }
    }
}

/// An item that can be put on the block
///
/// `highest_bid` and `winner` are written exactly once, at settlement. While
/// an auction is running the authoritative in-progress bid lives in the
/// engine, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub starting_price: Points,
    pub highest_bid: Points,
    pub winner: Option<TeamId>,
    /// When the item settled, epoch milliseconds. None until settlement.
    pub settled_at: Option<EpochMs>,
}

impl ItemRecord {
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        description: impl Into<String>,
        starting_price: Points,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            starting_price,
            highest_bid: 0,
            winner: None,
            settled_at: None,
        }
    }

    /// An item is settled once it has a winner; settled items never re-enter
    /// an auction.
    pub fn is_settled(&self) -> bool {
        self.winner.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_item_is_unsettled() {
        let item = ItemRecord::new("item-1", "Signed jersey", "Framed", 50);
        assert!(!item.is_settled());
        assert_eq!(item.highest_bid, 0);
        assert_eq!(item.starting_price, 50);
    }

    #[test]
    fn new_team_starts_broke() {
        let team = TeamRecord::new("team-1", "Red", vec!["ana".into(), "bo".into()]);
        assert_eq!(team.points, 0);
        assert_eq!(team.members.len(), 2);
    }
}
