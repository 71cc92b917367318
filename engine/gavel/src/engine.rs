//! The auction engine task and its handle
//!
//! One tokio task owns the only `ActiveAuction` value and drains one command
//! channel. Bids, start/end commands and clock ticks all arrive on that
//! channel, so no two mutating operations ever overlap and a tick that
//! observes expiry strictly happens-before any bid queued behind it.
//!
//! Status reads never enter the channel: the engine publishes a snapshot on
//! a watch after every mutation and readers clone it.

use crate::commands::{BidReceipt, Command, SettlementSummary, StartAuction, StartedSummary};
use crate::config::AuctionCfg;
use crate::error::AuctionError;
use crate::events::{
    AuctionEvent, EvBidUpdate, EvEnded, EvStarted, EvTimerExtended, EvTimerUpdate,
};
use crate::state::{ActiveAuction, RunningStatus, StatusSnapshot};
use crate::validator::{validate, BidRequest};
use crate::{EpochMs, Points, RoundId, TeamId};

use auction_clock::{now_ms, AuctionClock, ClockHandle, ClockTick};
use metrics::counter;
use point_ledger::{Ledger, LedgerError, SharedLedger};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

pub struct AuctionEngine {
    cfg: AuctionCfg,
    ledger: SharedLedger,
    commands: mpsc::UnboundedReceiver<Command>,
    /// Kept so each round's clock can push ticks into the same queue.
    commands_tx: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedSender<AuctionEvent>,
    status: watch::Sender<StatusSnapshot>,
    active: Option<ActiveAuction>,
    clock: Option<ClockHandle>,
    round: RoundId,
}

impl AuctionEngine {
    /// Spawn the engine task. Returns the cloneable handle and the event
    /// stream the broadcaster consumes.
    pub fn spawn(
        cfg: AuctionCfg,
        ledger: SharedLedger,
    ) -> (EngineHandle, mpsc::UnboundedReceiver<AuctionEvent>) {
        cfg.validate().expect("invalid AuctionCfg");

        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::default());

        let engine = Self {
            cfg,
            ledger,
            commands,
            commands_tx: commands_tx.clone(),
            events: events_tx,
            status: status_tx,
            active: None,
            clock: None,
            round: 0,
        };
        tokio::spawn(engine.run());

        (EngineHandle { commands: commands_tx, status: status_rx }, events_rx)
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Start { request, reply } => self.handle_start(request, reply),
                Command::Bid { team_id, amount, reply } => self.handle_bid(team_id, amount, reply),
                Command::End { reply } => {
                    let _ = reply.send(self.settle(now_ms()));
                }
                Command::Tick(tick) => self.handle_tick(tick),
            }
        }
        debug!("command channel closed, auction engine stopping");
    }

    fn handle_start(
        &mut self,
        request: StartAuction,
        reply: oneshot::Sender<Result<StartedSummary, AuctionError>>,
    ) {
        if let Some(active) = &self.active {
            let _ = reply.send(Err(AuctionError::Conflict { item_id: active.item_id.clone() }));
            return;
        }

        let item = match self.ledger.item(&request.item_id) {
            Ok(item) => item,
            Err(err) => {
                let _ = reply.send(Err(err.into()));
                return;
            }
        };
        if item.is_settled() {
            let _ = reply.send(Err(AuctionError::AlreadySettled { item_id: item.id }));
            return;
        }

        let duration_ms = request.duration_ms.unwrap_or(self.cfg.default_duration_ms);
        let now = now_ms();
        self.round += 1;
        let auction = ActiveAuction::begin(self.round, &item, duration_ms, now);

        self.clock = Some(AuctionClock::start(
            self.round,
            self.cfg.tick_interval(),
            self.commands_tx.clone(),
        ));

        info!(item = %auction.item_id, round = self.round, duration_ms, "auction started");
        let summary = StartedSummary {
            round: self.round,
            item_id: auction.item_id.clone(),
            item_name: auction.item_name.clone(),
            starting_price: auction.floor,
            duration_ms,
            end_time: auction.end_time,
        };
        let started = EvStarted {
            item_id: auction.item_id.clone(),
            item_name: auction.item_name.clone(),
            starting_price: auction.floor,
            start_time: auction.start_time,
            end_time: auction.end_time,
            duration_ms,
        };
        self.active = Some(auction);
        self.emit(AuctionEvent::Started(started));
        self.publish_status();
        let _ = reply.send(Ok(summary));
    }

    fn handle_bid(
        &mut self,
        team_id: TeamId,
        amount: Points,
        reply: oneshot::Sender<Result<BidReceipt, AuctionError>>,
    ) {
        let now = now_ms();
        let team = self.ledger.team(&team_id).ok();
        let request = BidRequest { team_id, amount };

        let swap = match validate(self.active.as_ref(), &request, team.as_ref()) {
            Ok(swap) => swap,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        // Refund-then-hold as one ledger transaction. A concurrent admin
        // deduction can still invalidate the funds check we just made; the
        // ledger re-checks under its own lock and we report that honestly.
        let new_balance = match self.ledger.swap_escrow(&swap) {
            Ok(balance) => balance,
            Err(LedgerError::InsufficientPoints { required, available }) => {
                let _ = reply.send(Err(AuctionError::InsufficientFunds { required, available }));
                return;
            }
            Err(err) => {
                error!(error = %err, team = %request.team_id, "escrow swap failed");
                counter!("gavel_ledger_faults", 1);
                let _ = reply.send(Err(AuctionError::Ledger));
                return;
            }
        };

        let Some(auction) = self.active.as_mut() else {
            // validate() only accepts while running.
            let _ = reply.send(Err(AuctionError::NoActiveAuction));
            return;
        };
        let old_bid = auction.highest_bid;
        let extended = auction.note_bid(&request.team_id, request.amount, now, &self.cfg);

        let bid_event = EvBidUpdate {
            item_id: auction.item_id.clone(),
            new_bid: request.amount,
            old_bid,
            leader: request.team_id.clone(),
            prior_leader: swap.refund.as_ref().map(|(team, _)| team.clone()),
            timer_extended: extended,
            time_remaining_ms: auction.remaining_ms(now),
            timestamp: now,
        };
        let extension_event = extended.then(|| EvTimerExtended {
            item_id: auction.item_id.clone(),
            new_end_time: auction.end_time,
            added_ms: self.cfg.extension_amount_ms,
            time_remaining_ms: auction.remaining_ms(now),
        });
        let receipt = BidReceipt {
            item_id: auction.item_id.clone(),
            amount: request.amount,
            new_balance,
            timer_extended: extended,
            end_time: auction.end_time,
        };

        info!(team = %request.team_id, amount = request.amount, extended, "bid accepted");
        self.emit(AuctionEvent::BidUpdate(bid_event));
        if let Some(extension) = extension_event {
            self.emit(AuctionEvent::TimerExtended(extension));
        }
        self.publish_status();
        let _ = reply.send(Ok(receipt));
    }

    fn handle_tick(&mut self, tick: ClockTick) {
        let Some(auction) = self.active.as_ref() else {
            return;
        };
        if tick.round != auction.round {
            debug!(tick_round = tick.round, round = auction.round, "dropping stale tick");
            return;
        }

        if auction.expired(tick.now_ms) {
            if let Err(err) = self.settle(tick.now_ms) {
                warn!(error = %err, "settlement failed, will retry on next tick");
            }
        } else {
            let update = EvTimerUpdate {
                item_id: auction.item_id.clone(),
                time_remaining_ms: auction.remaining_ms(tick.now_ms),
                end_time: auction.end_time,
            };
            self.emit(AuctionEvent::TimerUpdate(update));
        }
    }

    /// Shared settlement path for natural expiry and the administrative end
    /// command.
    fn settle(&mut self, now: EpochMs) -> Result<SettlementSummary, AuctionError> {
        let Some(auction) = self.active.take() else {
            return Err(AuctionError::NoActiveAuction);
        };

        // Commit the sale before tearing anything down. If the ledger
        // refuses, the round stays exactly as it was and keeps running.
        if let Some(winner) = &auction.leader {
            if let Err(err) =
                self.ledger.commit_sale(&auction.item_id, winner, auction.highest_bid, now)
            {
                error!(error = %err, item = %auction.item_id, "settlement commit failed");
                counter!("gavel_settlement_failures", 1);
                self.active = Some(auction);
                return Err(AuctionError::Ledger);
            }
        }

        // Cancel before this operation returns, so no pending tick can land
        // on a later round. The round guard backstops anything already
        // buffered; a cancel failure still gets counted and shouted about.
        if let Some(clock) = self.clock.take() {
            if let Err(err) = clock.cancel() {
                error!(error = %err, round = auction.round, "failed to cancel auction clock");
                counter!("gavel_clock_cancel_failures", 1);
            }
        }

        let summary = SettlementSummary {
            item_id: auction.item_id.clone(),
            item_name: auction.item_name.clone(),
            winner: auction.leader.clone(),
            winning_bid: auction.highest_bid,
            settled_at: now,
        };
        match &summary.winner {
            Some(winner) => {
                info!(item = %summary.item_id, %winner, winning_bid = summary.winning_bid, "auction settled")
            }
            None => info!(item = %summary.item_id, "auction ended with no bids"),
        }
        self.emit(AuctionEvent::Ended(EvEnded {
            item_id: summary.item_id.clone(),
            winning_bid: summary.winning_bid,
            winner: summary.winner.clone(),
            timestamp: now,
        }));
        self.publish_status();
        Ok(summary)
    }

    fn emit(&self, event: AuctionEvent) {
        if self.events.send(event).is_err() {
            debug!("no event consumer attached, dropping event");
        }
    }

    fn publish_status(&self) {
        let snapshot = StatusSnapshot { active: self.active.as_ref().map(RunningStatus::from) };
        self.status.send_replace(snapshot);
    }
}

/// Cloneable entry point into the engine task
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<StatusSnapshot>,
}

impl EngineHandle {
    pub async fn start_auction(
        &self,
        request: StartAuction,
    ) -> Result<StartedSummary, AuctionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Start { request, reply })
            .map_err(|_| AuctionError::EngineClosed)?;
        response.await.map_err(|_| AuctionError::EngineClosed)?
    }

    pub async fn place_bid(
        &self,
        team_id: TeamId,
        amount: Points,
    ) -> Result<BidReceipt, AuctionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Bid { team_id, amount, reply })
            .map_err(|_| AuctionError::EngineClosed)?;
        response.await.map_err(|_| AuctionError::EngineClosed)?
    }

    pub async fn end_auction(&self) -> Result<SettlementSummary, AuctionError> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::End { reply }).map_err(|_| AuctionError::EngineClosed)?;
        response.await.map_err(|_| AuctionError::EngineClosed)?
    }

    /// Consistent snapshot of the current round; never blocks behind queued
    /// commands.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use point_ledger::{InMemoryLedger, ItemRecord, Ledger, TeamRecord};
    use std::sync::Arc;

    fn seeded_ledger() -> SharedLedger {
        let ledger = InMemoryLedger::new();
        for (id, points) in [("team-a", 100u64), ("team-b", 200u64)] {
            let mut team = TeamRecord::new(id, id.to_uppercase(), vec![]);
            team.points = points;
            ledger.create_team(team).unwrap();
        }
        ledger.create_item(ItemRecord::new("item-x", "Trophy", "The big one", 10)).unwrap();
        ledger.create_item(ItemRecord::new("item-sold", "Old jersey", "", 5)).unwrap();
        ledger.commit_sale("item-sold", "team-a", 30, 1_000).unwrap();
        Arc::new(ledger)
    }

    // Long default round and a dormant real clock: ticks in these tests are
    // fabricated so timing never races the assertions.
    fn test_cfg() -> AuctionCfg {
        AuctionCfg {
            default_duration_ms: 600_000,
            extension_threshold_ms: 1_500,
            extension_amount_ms: 1_000,
            tick_interval_ms: 3_600_000,
        }
    }

    fn start_req(item_id: &str) -> StartAuction {
        StartAuction { item_id: item_id.into(), duration_ms: None }
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<AuctionEvent>) -> Vec<AuctionEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = events.try_recv() {
            drained.push(event);
        }
        drained
    }

    #[tokio::test]
    async fn start_checks_item_then_refuses_conflicts() {
        let ledger = seeded_ledger();
        let (engine, _events) = AuctionEngine::spawn(test_cfg(), ledger);

        let err = engine.start_auction(start_req("nope")).await.unwrap_err();
        assert_eq!(err, AuctionError::ItemNotFound { item_id: "nope".into() });

        let err = engine.start_auction(start_req("item-sold")).await.unwrap_err();
        assert_eq!(err, AuctionError::AlreadySettled { item_id: "item-sold".into() });

        let started = engine.start_auction(start_req("item-x")).await.unwrap();
        assert_eq!(started.starting_price, 10);
        assert_eq!(started.duration_ms, 600_000);

        // Second start leaves the running round untouched.
        let err = engine.start_auction(start_req("item-x")).await.unwrap_err();
        assert_eq!(err, AuctionError::Conflict { item_id: "item-x".into() });
        let status = engine.status();
        assert_eq!(status.active.unwrap().round, started.round);
    }

    #[tokio::test]
    async fn bidding_war_refunds_and_settles_per_the_book() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger.clone());
        engine.start_auction(start_req("item-x")).await.unwrap();

        // A leads at 50 and has the points held.
        let receipt = engine.place_bid("team-a".into(), 50).await.unwrap();
        assert_eq!(receipt.new_balance, 50);
        assert!(!receipt.timer_extended);

        // B lowballs; nothing moves.
        let err = engine.place_bid("team-b".into(), 40).await.unwrap_err();
        assert_eq!(err, AuctionError::BidTooLow { bid: 40, minimum: 50 });
        assert_eq!(ledger.team("team-a").unwrap().points, 50);
        assert_eq!(ledger.team("team-b").unwrap().points, 200);

        // B takes the lead; A is made whole in the same transaction.
        let receipt = engine.place_bid("team-b".into(), 60).await.unwrap();
        assert_eq!(receipt.new_balance, 140);
        assert_eq!(ledger.team("team-a").unwrap().points, 100);

        let summary = engine.end_auction().await.unwrap();
        assert_eq!(summary.winner.as_deref(), Some("team-b"));
        assert_eq!(summary.winning_bid, 60);

        // Escrow was consumed as the purchase price, not refunded.
        assert_eq!(ledger.team("team-b").unwrap().points, 140);
        let item = ledger.item("item-x").unwrap();
        assert_eq!(item.winner.as_deref(), Some("team-b"));
        assert_eq!(item.highest_bid, 60);

        // Round is over for good.
        let err = engine.place_bid("team-a".into(), 70).await.unwrap_err();
        assert_eq!(err, AuctionError::NoActiveAuction);

        let kinds: Vec<_> = drain(&mut events).iter().map(|e| e.kind()).collect();
        use crate::events::EventKind::*;
        assert_eq!(kinds, vec![Started, BidUpdate, BidUpdate, Ended]);
    }

    #[tokio::test]
    async fn late_bid_extends_and_orders_events() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger);

        // 1s round with a 1.5s threshold: every bid lands inside the window.
        let started = engine
            .start_auction(StartAuction { item_id: "item-x".into(), duration_ms: Some(1_000) })
            .await
            .unwrap();

        let receipt = engine.place_bid("team-a".into(), 50).await.unwrap();
        assert!(receipt.timer_extended);
        assert_eq!(receipt.end_time, started.end_time + 1_000);

        let drained = drain(&mut events);
        match &drained[..] {
            [AuctionEvent::Started(_), AuctionEvent::BidUpdate(bid), AuctionEvent::TimerExtended(ext)] =>
            {
                assert!(bid.timer_extended);
                assert_eq!(ext.added_ms, 1_000);
                assert_eq!(ext.new_end_time, started.end_time + 1_000);
            }
            other => panic!("unexpected event sequence: {other:?}"),
        }

        engine.end_auction().await.unwrap();
    }

    #[tokio::test]
    async fn early_bid_never_moves_the_deadline() {
        let ledger = seeded_ledger();
        let (engine, _events) = AuctionEngine::spawn(test_cfg(), ledger);
        let started = engine.start_auction(start_req("item-x")).await.unwrap();

        let receipt = engine.place_bid("team-a".into(), 50).await.unwrap();
        assert!(!receipt.timer_extended);
        assert_eq!(receipt.end_time, started.end_time);
    }

    #[tokio::test]
    async fn expiry_tick_settles_the_round() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger.clone());
        let started = engine.start_auction(start_req("item-x")).await.unwrap();
        engine.place_bid("team-a".into(), 50).await.unwrap();

        // Fabricated expiry tick; queued commands behind it see Idle.
        engine
            .commands
            .send(Command::Tick(ClockTick { round: started.round, now_ms: started.end_time }))
            .unwrap();
        let err = engine.end_auction().await.unwrap_err();
        assert_eq!(err, AuctionError::NoActiveAuction);

        let item = ledger.item("item-x").unwrap();
        assert_eq!(item.winner.as_deref(), Some("team-a"));
        assert_eq!(item.highest_bid, 50);
        assert_eq!(ledger.team("team-a").unwrap().points, 50);

        let last = drain(&mut events).pop().unwrap();
        match last {
            AuctionEvent::Ended(ended) => {
                assert_eq!(ended.winner.as_deref(), Some("team-a"));
                assert_eq!(ended.winning_bid, 50);
            }
            other => panic!("expected ended event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pre_deadline_tick_reports_remaining_time() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger);
        let started = engine.start_auction(start_req("item-x")).await.unwrap();

        engine
            .commands
            .send(Command::Tick(ClockTick {
                round: started.round,
                now_ms: started.end_time - 4_000,
            }))
            .unwrap();
        // A no-op query behind the tick guarantees it was processed.
        let err = engine.place_bid("ghost".into(), 1).await.unwrap_err();
        assert_eq!(err, AuctionError::TeamNotFound { team_id: "ghost".into() });

        let drained = drain(&mut events);
        match drained.last() {
            Some(AuctionEvent::TimerUpdate(update)) => {
                assert_eq!(update.time_remaining_ms, 4_000);
                assert_eq!(update.end_time, started.end_time);
            }
            other => panic!("expected timer update, got {other:?}"),
        }

        engine.end_auction().await.unwrap();
    }

    #[tokio::test]
    async fn stale_round_tick_is_inert() {
        let ledger = seeded_ledger();
        let (engine, _events) = AuctionEngine::spawn(test_cfg(), ledger);
        let started = engine.start_auction(start_req("item-x")).await.unwrap();

        engine
            .commands
            .send(Command::Tick(ClockTick { round: started.round + 7, now_ms: u64::MAX / 2 }))
            .unwrap();

        // Still running: the expired-looking tick belonged to another round.
        let receipt = engine.place_bid("team-a".into(), 50).await.unwrap();
        assert_eq!(receipt.new_balance, 50);
        assert!(engine.status().active.is_some());

        engine.end_auction().await.unwrap();
    }

    #[tokio::test]
    async fn no_bid_expiry_keeps_the_item_available() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger.clone());
        let started = engine.start_auction(start_req("item-x")).await.unwrap();

        engine
            .commands
            .send(Command::Tick(ClockTick { round: started.round, now_ms: started.end_time }))
            .unwrap();
        let err = engine.end_auction().await.unwrap_err();
        assert_eq!(err, AuctionError::NoActiveAuction);

        assert!(!ledger.item("item-x").unwrap().is_settled());
        match drain(&mut events).pop().unwrap() {
            AuctionEvent::Ended(ended) => {
                assert_eq!(ended.winner, None);
                assert_eq!(ended.winning_bid, 0);
            }
            other => panic!("expected ended event, got {other:?}"),
        }

        // The same item can go back on the block.
        let again = engine.start_auction(start_req("item-x")).await.unwrap();
        assert_eq!(again.round, started.round + 1);
        engine.end_auction().await.unwrap();
    }

    #[tokio::test]
    async fn funds_and_identity_rejections_reach_only_the_caller() {
        let ledger = seeded_ledger();
        let (engine, mut events) = AuctionEngine::spawn(test_cfg(), ledger.clone());
        engine.start_auction(start_req("item-x")).await.unwrap();
        drain(&mut events);

        let err = engine.place_bid("team-a".into(), 150).await.unwrap_err();
        assert_eq!(err, AuctionError::InsufficientFunds { required: 150, available: 100 });
        let err = engine.place_bid("ghost".into(), 50).await.unwrap_err();
        assert_eq!(err, AuctionError::TeamNotFound { team_id: "ghost".into() });

        // Rejections are not broadcast and change nothing.
        assert!(drain(&mut events).is_empty());
        assert_eq!(ledger.team("team-a").unwrap().points, 100);
        assert!(engine.status().active.unwrap().leader.is_none());

        engine.end_auction().await.unwrap();
    }

    #[tokio::test]
    async fn status_snapshot_tracks_the_round_without_queueing() {
        let ledger = seeded_ledger();
        let (engine, _events) = AuctionEngine::spawn(test_cfg(), ledger);

        assert!(engine.status().active.is_none());

        let started = engine.start_auction(start_req("item-x")).await.unwrap();
        engine.place_bid("team-b".into(), 25).await.unwrap();

        let status = engine.status().active.unwrap();
        assert_eq!(status.item_id, "item-x");
        assert_eq!(status.highest_bid, 25);
        assert_eq!(status.leader.as_deref(), Some("team-b"));
        assert_eq!(status.end_time, started.end_time);
        assert_eq!(status.time_remaining_ms(started.end_time - 3_000), 3_000);

        engine.end_auction().await.unwrap();
        assert!(engine.status().active.is_none());
    }
}
