//! Bid validation - a pure decision, no side effects
//!
//! The check order is part of the engine's contract: phase, then identity,
//! then funds, then amount. Callers and tests rely on a given invalid bid
//! always producing the same rejection.

use crate::{ActiveAuction, AuctionError, Points, TeamId};
use point_ledger::{EscrowSwap, TeamRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidRequest {
    pub team_id: TeamId,
    pub amount: Points,
}

/// Decide a bid against the current auction state and a ledger snapshot.
///
/// Returns the escrow swap to commit: refund the displaced leader (if any),
/// hold the bidder's amount. The caller applies it atomically.
pub fn validate(
    auction: Option<&ActiveAuction>,
    request: &BidRequest,
    team: Option<&TeamRecord>,
) -> Result<EscrowSwap, AuctionError> {
    let auction = auction.ok_or(AuctionError::NoActiveAuction)?;

    let team = team
        .ok_or_else(|| AuctionError::TeamNotFound { team_id: request.team_id.clone() })?;

    // A leader raising their own bid has their current hold refunded in the
    // same transaction, so it still counts as spendable here.
    let own_escrow = match &auction.escrow {
        Some((holder, amount)) if *holder == team.id => *amount,
        _ => 0,
    };
    let available = team.points + own_escrow;
    if request.amount > available {
        return Err(AuctionError::InsufficientFunds { required: request.amount, available });
    }

    let minimum = auction.min_to_beat();
    if request.amount <= minimum {
        return Err(AuctionError::BidTooLow { bid: request.amount, minimum });
    }

    Ok(EscrowSwap {
        refund: auction.escrow.clone(),
        hold: (team.id.clone(), request.amount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuctionCfg;
    use point_ledger::ItemRecord;

    fn running() -> ActiveAuction {
        let item = ItemRecord::new("item-x", "Trophy", "", 10);
        ActiveAuction::begin(1, &item, 5_000, 100_000)
    }

    fn team(id: &str, points: Points) -> TeamRecord {
        let mut team = TeamRecord::new(id, id.to_uppercase(), vec![]);
        team.points = points;
        team
    }

    fn bid(team_id: &str, amount: Points) -> BidRequest {
        BidRequest { team_id: team_id.into(), amount }
    }

    #[test]
    fn phase_is_checked_first() {
        // No auction and an unknown team: the phase error wins.
        let err = validate(None, &bid("ghost", 50), None).unwrap_err();
        assert_eq!(err, AuctionError::NoActiveAuction);
    }

    #[test]
    fn identity_is_checked_before_funds_and_amount() {
        let auction = running();
        // Unknown team bidding an absurd amount: identity error wins.
        let err = validate(Some(&auction), &bid("ghost", 1_000_000), None).unwrap_err();
        assert_eq!(err, AuctionError::TeamNotFound { team_id: "ghost".into() });
    }

    #[test]
    fn funds_are_checked_before_amount() {
        let auction = running();
        // Bid is both unaffordable and too low-ordering says unaffordable.
        let mut broke = team("team-a", 0);
        broke.points = 3;
        let err = validate(Some(&auction), &bid("team-a", 5), Some(&broke)).unwrap_err();
        assert_eq!(err, AuctionError::InsufficientFunds { required: 5, available: 3 });
    }

    #[test]
    fn first_bid_must_strictly_exceed_the_floor() {
        let auction = running();
        let rich = team("team-a", 100);
        let err = validate(Some(&auction), &bid("team-a", 10), Some(&rich)).unwrap_err();
        assert_eq!(err, AuctionError::BidTooLow { bid: 10, minimum: 10 });

        let swap = validate(Some(&auction), &bid("team-a", 11), Some(&rich)).unwrap();
        assert_eq!(swap, EscrowSwap { refund: None, hold: ("team-a".into(), 11) });
    }

    #[test]
    fn later_bids_must_strictly_exceed_the_highest() {
        let mut auction = running();
        auction.note_bid("team-a", 50, 100_000, &AuctionCfg::default());

        let b = team("team-b", 200);
        let err = validate(Some(&auction), &bid("team-b", 40), Some(&b)).unwrap_err();
        assert_eq!(err, AuctionError::BidTooLow { bid: 40, minimum: 50 });
        let err = validate(Some(&auction), &bid("team-b", 50), Some(&b)).unwrap_err();
        assert_eq!(err, AuctionError::BidTooLow { bid: 50, minimum: 50 });

        let swap = validate(Some(&auction), &bid("team-b", 60), Some(&b)).unwrap();
        assert_eq!(
            swap,
            EscrowSwap { refund: Some(("team-a".into(), 50)), hold: ("team-b".into(), 60) }
        );
    }

    #[test]
    fn leader_outbidding_themselves_spends_their_own_escrow() {
        let mut auction = running();
        auction.note_bid("team-a", 80, 100_000, &AuctionCfg::default());

        // Balance after the 80 hold is 20; raising to 90 only works because
        // the 80 is refunded in the same swap.
        let a = team("team-a", 20);
        let swap = validate(Some(&auction), &bid("team-a", 90), Some(&a)).unwrap();
        assert_eq!(
            swap,
            EscrowSwap { refund: Some(("team-a".into(), 80)), hold: ("team-a".into(), 90) }
        );

        let err = validate(Some(&auction), &bid("team-a", 101), Some(&a)).unwrap_err();
        assert_eq!(err, AuctionError::InsufficientFunds { required: 101, available: 100 });
    }
}
