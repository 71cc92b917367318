//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one auction engine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionCfg {
    /// Auction length when the start command names none. Default 3 minutes.
    pub default_duration_ms: u64,

    /// A bid landing with less than this much time left triggers an
    /// extension.
    pub extension_threshold_ms: u64,

    /// How far each extension pushes the deadline. Extensions repeat without
    /// bound across successive late bids; a bidding war ends when bidders
    /// stop, not when a cap fires.
    pub extension_amount_ms: u64,

    /// Clock tick granularity.
    pub tick_interval_ms: u64,
}

impl Default for AuctionCfg {
    fn default() -> Self {
        Self {
            default_duration_ms: 180_000,
            extension_threshold_ms: 15_000,
            extension_amount_ms: 10_000,
            tick_interval_ms: auction_clock::DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl AuctionCfg {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.default_duration_ms == 0 {
            return Err("default_duration_ms must be positive");
        }
        if self.extension_amount_ms == 0 {
            return Err("extension_amount_ms must be positive");
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be positive");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
