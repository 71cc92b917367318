//! AuctionService - wiring for the live points-auction platform
//!
//! Loads configuration, seeds the ledger, spawns the auction engine and the
//! gateway, and handles graceful shutdown.

pub mod config;
pub mod logging;
pub mod service;
pub mod signals;

pub use config::{load_configuration, LoggingConfig, SeedConfig, ServiceConfig};
pub use logging::initialize_logging;
pub use service::ServiceState;
pub use signals::{graceful_shutdown, setup_signal_handlers};
