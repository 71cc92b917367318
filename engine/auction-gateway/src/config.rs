//! Configuration for the AuctionGateway

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket bidding endpoint
    pub server: ServerConfig,

    /// REST admin surface
    pub rest: RestConfig,

    /// Static bearer token guarding the admin routes
    pub admin_token: String,

    /// Idle bidder sessions are dropped after this long
    pub session_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8081,
                max_connections: 512,
            },
            rest: RestConfig { host: "0.0.0.0".to_string(), port: 8080 },
            admin_token: "change-me".to_string(),
            session_ttl_secs: 3_600,
        }
    }
}

impl GatewayConfig {
    pub fn server_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn rest_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.rest.host, self.rest.port).parse()
    }
}
