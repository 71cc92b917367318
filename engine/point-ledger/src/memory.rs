//! In-memory ledger

use crate::{
    EpochMs, EscrowSwap, ItemRecord, Ledger, LedgerError, Points, Result, SharedLedger, TeamRecord,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
struct Store {
    teams: HashMap<String, TeamRecord>,
    items: HashMap<String, ItemRecord>,
}

/// Ledger backed by process memory
///
/// One mutex over the whole store. Every trait method is a single critical
/// section, so compound operations are transactional: nothing observes or
/// survives a partially applied swap.
#[derive(Default)]
pub struct InMemoryLedger {
    store: Mutex<Store>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> SharedLedger {
        Arc::new(Self::new())
    }
}

impl Ledger for InMemoryLedger {
    fn team(&self, team_id: &str) -> Result<TeamRecord> {
        self.store
            .lock()
            .teams
            .get(team_id)
            .cloned()
            .ok_or_else(|| LedgerError::TeamNotFound { team_id: team_id.to_owned() })
    }

    fn item(&self, item_id: &str) -> Result<ItemRecord> {
        self.store
            .lock()
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| LedgerError::ItemNotFound { item_id: item_id.to_owned() })
    }

    fn teams_by_points(&self) -> Vec<TeamRecord> {
        let mut teams: Vec<_> = self.store.lock().teams.values().cloned().collect();
        teams.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.id.cmp(&b.id)));
        teams
    }

    fn available_items(&self) -> Vec<ItemRecord> {
        let mut items: Vec<_> =
            self.store.lock().items.values().filter(|i| !i.is_settled()).cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }

    fn settled_items(&self) -> Vec<ItemRecord> {
        let mut items: Vec<_> =
            self.store.lock().items.values().filter(|i| i.is_settled()).cloned().collect();
        items.sort_by(|a, b| b.settled_at.cmp(&a.settled_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    fn swap_escrow(&self, swap: &EscrowSwap) -> Result<Points> {
        let mut store = self.store.lock();
        let (holder_id, hold_amount) = &swap.hold;

        let holder_balance = store
            .teams
            .get(holder_id)
            .ok_or_else(|| LedgerError::TeamNotFound { team_id: holder_id.clone() })?
            .points;

        if let Some((refund_id, _)) = &swap.refund {
            if !store.teams.contains_key(refund_id) {
                return Err(LedgerError::TeamNotFound { team_id: refund_id.clone() });
            }
        }

        // A leader raising their own bid gets their current hold back as
        // part of the same transaction, so it counts as spendable.
        let refund_credit = match &swap.refund {
            Some((refund_id, amount)) if refund_id == holder_id => *amount,
            _ => 0,
        };
        let available = holder_balance + refund_credit;
        if *hold_amount > available {
            return Err(LedgerError::InsufficientPoints { required: *hold_amount, available });
        }

        // Validated: apply refund then hold. Both succeed or neither ran.
        if let Some((refund_id, amount)) = &swap.refund {
            let refunded = store.teams.get_mut(refund_id).expect("refund team checked above");
            refunded.points += amount;
        }
        let holder = store.teams.get_mut(holder_id).expect("holder checked above");
        holder.points -= hold_amount;
        Ok(holder.points)
    }

    fn commit_sale(
        &self,
        item_id: &str,
        winner: &str,
        price: Points,
        settled_at: EpochMs,
    ) -> Result<()> {
        let mut store = self.store.lock();
        if !store.teams.contains_key(winner) {
            return Err(LedgerError::TeamNotFound { team_id: winner.to_owned() });
        }
        let item = store
            .items
            .get_mut(item_id)
            .ok_or_else(|| LedgerError::ItemNotFound { item_id: item_id.to_owned() })?;
        if item.is_settled() {
            return Err(LedgerError::AlreadySettled { item_id: item_id.to_owned() });
        }
        item.highest_bid = price;
        item.winner = Some(winner.to_owned());
        item.settled_at = Some(settled_at);
        info!(item_id, winner, price, "sale committed");
        Ok(())
    }

    fn create_team(&self, team: TeamRecord) -> Result<()> {
        let mut store = self.store.lock();
        if store.teams.contains_key(&team.id) {
            return Err(LedgerError::DuplicateTeam { team_id: team.id });
        }
        store.teams.insert(team.id.clone(), team);
        Ok(())
    }

    fn create_item(&self, item: ItemRecord) -> Result<()> {
        let mut store = self.store.lock();
        if store.items.contains_key(&item.id) {
            return Err(LedgerError::DuplicateItem { item_id: item.id });
        }
        store.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn award_points(&self, team_id: &str, points: Points) -> Result<Points> {
        if points == 0 {
            return Err(LedgerError::ZeroPoints);
        }
        let mut store = self.store.lock();
        let team = store
            .teams
            .get_mut(team_id)
            .ok_or_else(|| LedgerError::TeamNotFound { team_id: team_id.to_owned() })?;
        team.points += points;
        Ok(team.points)
    }

    fn deduct_points(&self, team_id: &str, points: Points) -> Result<Points> {
        if points == 0 {
            return Err(LedgerError::ZeroPoints);
        }
        let mut store = self.store.lock();
        let team = store
            .teams
            .get_mut(team_id)
            .ok_or_else(|| LedgerError::TeamNotFound { team_id: team_id.to_owned() })?;
        if team.points < points {
            return Err(LedgerError::InsufficientPoints {
                required: points,
                available: team.points,
            });
        }
        team.points -= points;
        Ok(team.points)
    }
}
