//! Error types for the AuctionGateway

use thiserror::Error;

/// Errors that can occur in the AuctionGateway
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid request parameters: {0}")]
    InvalidParams(String),
}

/// Result type for AuctionGateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
