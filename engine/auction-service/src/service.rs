//! Service state - builds and owns the platform components

use crate::config::{SeedConfig, ServiceConfig};
use anyhow::{Context, Result};
use auction_gateway::AuctionGateway;
use gavel::{AuctionEngine, AuctionEvent, EngineHandle};
use point_ledger::{InMemoryLedger, ItemRecord, Ledger, SharedLedger, TeamRecord};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

pub struct ServiceState {
    pub config: ServiceConfig,
    ledger: SharedLedger,
    engine: EngineHandle,
    gateway: Arc<AuctionGateway>,
    /// Taken by the gateway when it starts consuming broadcasts.
    events: Mutex<Option<mpsc::UnboundedReceiver<AuctionEvent>>>,
}

impl ServiceState {
    /// Build the ledger, engine and gateway. Must run inside a tokio
    /// runtime; the engine task is spawned here.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config
            .auction
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid auction config: {msg}"))?;

        let ledger = InMemoryLedger::new_shared();
        seed_ledger(&ledger, &config.seed)?;

        let (engine, events) = AuctionEngine::spawn(config.auction.clone(), ledger.clone());
        let gateway =
            Arc::new(AuctionGateway::new(config.gateway.clone(), engine.clone(), ledger.clone()));

        Ok(Self { config, ledger, engine, gateway, events: Mutex::new(Some(events)) })
    }

    /// Run the gateway (blocks on its accept loop).
    pub async fn start_gateway(&self) -> Result<()> {
        let events = self
            .events
            .lock()
            .await
            .take()
            .context("gateway already started")?;
        self.gateway.start(events).await?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.gateway.stop().await?;
        Ok(())
    }

    pub fn ledger(&self) -> SharedLedger {
        self.ledger.clone()
    }

    pub fn engine(&self) -> EngineHandle {
        self.engine.clone()
    }
}

fn seed_ledger(ledger: &SharedLedger, seed: &SeedConfig) -> Result<()> {
    for team in &seed.teams {
        let mut record = TeamRecord::new(team.id.clone(), team.name.clone(), team.members.clone());
        record.points = team.points;
        ledger
            .create_team(record)
            .with_context(|| format!("failed to seed team {}", team.id))?;
    }
    for item in &seed.items {
        let record = ItemRecord::new(
            item.id.clone(),
            item.name.clone(),
            item.description.clone(),
            item.starting_price,
        );
        ledger
            .create_item(record)
            .with_context(|| format!("failed to seed item {}", item.id))?;
    }
    if !seed.teams.is_empty() || !seed.items.is_empty() {
        info!(teams = seed.teams.len(), items = seed.items.len(), "ledger seeded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedItem, SeedTeam};

    #[tokio::test]
    async fn seeded_state_serves_status_and_listings() {
        let config = ServiceConfig {
            seed: SeedConfig {
                teams: vec![SeedTeam {
                    id: "team-a".into(),
                    name: "Alpha".into(),
                    members: vec![],
                    points: 100,
                }],
                items: vec![SeedItem {
                    id: "item-x".into(),
                    name: "Trophy".into(),
                    description: String::new(),
                    starting_price: 10,
                }],
            },
            ..ServiceConfig::default()
        };

        let state = ServiceState::new(config).unwrap();
        assert_eq!(state.ledger().team("team-a").unwrap().points, 100);
        assert_eq!(state.ledger().available_items().len(), 1);
        assert!(state.engine().status().active.is_none());
    }

    #[tokio::test]
    async fn duplicate_seed_ids_fail_loudly() {
        let team = SeedTeam { id: "team-a".into(), name: "Alpha".into(), members: vec![], points: 0 };
        let config = ServiceConfig {
            seed: SeedConfig { teams: vec![team.clone(), team], items: vec![] },
            ..ServiceConfig::default()
        };
        assert!(ServiceState::new(config).is_err());
    }
}
