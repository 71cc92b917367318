//! Auction state - the one mutable value the engine serializes access to

use crate::{AuctionCfg, EpochMs, ItemId, Points, RoundId, TeamId};
use point_ledger::ItemRecord;

/// The item currently on the block
///
/// Exactly zero or one of these exists, owned by the engine task. All fields
/// here are authoritative while the round runs; the item record only learns
/// the outcome at settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAuction {
    pub round: RoundId,
    pub item_id: ItemId,
    pub item_name: String,
    /// The item's starting price. The first accepted bid must strictly
    /// exceed it.
    pub floor: Points,
    /// 0 until the first bid is accepted; strictly increasing afterwards.
    pub highest_bid: Points,
    pub leader: Option<TeamId>,
    /// The current leader's held points. Mirrors (leader, highest_bid)
    /// whenever a leader exists.
    pub escrow: Option<(TeamId, Points)>,
    pub start_time: EpochMs,
    /// Only ever moves forward (anti-snipe extends, never shortens).
    pub end_time: EpochMs,
}

impl ActiveAuction {
    pub fn begin(round: RoundId, item: &ItemRecord, duration_ms: u64, now: EpochMs) -> Self {
        Self {
            round,
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            floor: item.starting_price,
            highest_bid: 0,
            leader: None,
            escrow: None,
            start_time: now,
            end_time: now + duration_ms,
        }
    }

    /// The amount a new bid must strictly exceed.
    pub fn min_to_beat(&self) -> Points {
        self.highest_bid.max(self.floor)
    }

    pub fn remaining_ms(&self, now: EpochMs) -> u64 {
        self.end_time.saturating_sub(now)
    }

    pub fn expired(&self, now: EpochMs) -> bool {
        now >= self.end_time
    }

    /// Record an accepted bid and run the anti-snipe check. Returns true if
    /// the deadline was extended.
    pub fn note_bid(&mut self, team_id: &str, amount: Points, now: EpochMs, cfg: &AuctionCfg) -> bool {
        self.highest_bid = amount;
        self.leader = Some(team_id.to_owned());
        self.escrow = Some((team_id.to_owned(), amount));

        let extended = self.remaining_ms(now) < cfg.extension_threshold_ms;
        if extended {
            self.end_time += cfg.extension_amount_ms;
        }
        extended
    }
}

/// Read-only view published after every mutation
///
/// Served to status queries without entering the serialized command path.
/// Remaining time is deliberately absent: readers compute it from `end_time`
/// at serve time, so a snapshot can never report stale remaining time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub active: Option<RunningStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningStatus {
    pub round: RoundId,
    pub item_id: ItemId,
    pub item_name: String,
    pub floor: Points,
    pub highest_bid: Points,
    pub leader: Option<TeamId>,
    pub start_time: EpochMs,
    pub end_time: EpochMs,
}

impl RunningStatus {
    pub fn time_remaining_ms(&self, now: EpochMs) -> u64 {
        self.end_time.saturating_sub(now)
    }
}

impl From<&ActiveAuction> for RunningStatus {
    fn from(auction: &ActiveAuction) -> Self {
        Self {
            round: auction.round,
            item_id: auction.item_id.clone(),
            item_name: auction.item_name.clone(),
            floor: auction.floor,
            highest_bid: auction.highest_bid,
            leader: auction.leader.clone(),
            start_time: auction.start_time,
            end_time: auction.end_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> ItemRecord {
        ItemRecord::new("item-x", "Trophy", "The big one", 10)
    }

    fn cfg() -> AuctionCfg {
        AuctionCfg {
            extension_threshold_ms: 1_500,
            extension_amount_ms: 1_000,
            ..AuctionCfg::default()
        }
    }

    #[test]
    fn begin_loads_floor_and_deadline() {
        let auction = ActiveAuction::begin(1, &item(), 5_000, 100_000);
        assert_eq!(auction.floor, 10);
        assert_eq!(auction.highest_bid, 0);
        assert_eq!(auction.min_to_beat(), 10);
        assert_eq!(auction.end_time, 105_000);
        assert!(auction.leader.is_none());
    }

    #[test]
    fn bid_with_time_to_spare_never_moves_the_deadline() {
        let mut auction = ActiveAuction::begin(1, &item(), 5_000, 100_000);
        // remaining 5000 >= threshold 1500
        let extended = auction.note_bid("team-a", 50, 100_000, &cfg());
        assert!(!extended);
        assert_eq!(auction.end_time, 105_000);
        assert_eq!(auction.min_to_beat(), 50);
        assert_eq!(auction.escrow, Some(("team-a".into(), 50)));
    }

    #[test]
    fn late_bid_extends_by_exactly_the_configured_amount() {
        let mut auction = ActiveAuction::begin(1, &item(), 5_000, 100_000);
        // remaining 1200 < threshold 1500
        let extended = auction.note_bid("team-b", 60, 103_800, &cfg());
        assert!(extended);
        assert_eq!(auction.end_time, 106_000);
    }

    #[test]
    fn boundary_remaining_equal_to_threshold_does_not_extend() {
        let mut auction = ActiveAuction::begin(1, &item(), 5_000, 100_000);
        let extended = auction.note_bid("team-b", 60, 103_500, &cfg());
        assert!(!extended);
        assert_eq!(auction.end_time, 105_000);
    }

    #[test]
    fn extensions_repeat_without_bound() {
        let mut auction = ActiveAuction::begin(1, &item(), 2_000, 100_000);
        let mut now = 101_000;
        for bid in [20, 30, 40, 50, 60] {
            assert!(auction.note_bid("team-a", bid, now, &cfg()));
            now = auction.end_time - 500;
        }
        assert_eq!(auction.end_time, 107_000);
    }

    #[test]
    fn remaining_is_computed_not_counted() {
        let auction = ActiveAuction::begin(1, &item(), 5_000, 100_000);
        assert_eq!(auction.remaining_ms(100_000), 5_000);
        assert_eq!(auction.remaining_ms(104_999), 1);
        assert_eq!(auction.remaining_ms(105_000), 0);
        assert_eq!(auction.remaining_ms(999_999), 0);
        assert!(auction.expired(105_000));
        assert!(!auction.expired(104_999));
    }
}
