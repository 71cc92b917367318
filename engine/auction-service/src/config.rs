//! Service configuration management

use anyhow::{Context, Result};
use auction_gateway::GatewayConfig;
use gavel::AuctionCfg;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Auction engine configuration
    pub auction: AuctionCfg,

    /// Gateway configuration
    pub gateway: GatewayConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Teams and items loaded into the ledger at startup
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter, e.g. "info" or "gavel=debug,info"
    pub level: String,

    /// "text" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "text".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub teams: Vec<SeedTeam>,
    pub items: Vec<SeedItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub points: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starting_price: u64,
}

/// Load configuration from a TOML file, or the built-in defaults when no
/// path is given.
pub fn load_configuration(path: Option<&Path>) -> Result<ServiceConfig> {
    let Some(path) = path else {
        return Ok(ServiceConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: ServiceConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config.auction.validate().map_err(|msg| anyhow::anyhow!("invalid auction config: {msg}"))?;
    Ok(config)
}
