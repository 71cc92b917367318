//! Main AuctionGateway implementation

use crate::auth::SessionAuth;
use crate::broadcaster::EventBroadcaster;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::rest_api;
use crate::websocket_handler::WebSocketHandler;

use gavel::{AuctionEvent, EngineHandle};
use point_ledger::SharedLedger;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

/// Main AuctionGateway service
pub struct AuctionGateway {
    /// Gateway configuration
    config: GatewayConfig,

    /// Handle into the auction engine's serialized command channel
    engine: EngineHandle,

    /// Ledger for sessions and the admin surface
    ledger: SharedLedger,

    /// Bidder session manager
    auth: Arc<SessionAuth>,

    /// Ordered event fan-out
    broadcaster: Arc<EventBroadcaster>,

    /// Connection count
    connection_count: Arc<RwLock<usize>>,

    /// Running state
    is_running: Arc<RwLock<bool>>,
}

impl AuctionGateway {
    pub fn new(config: GatewayConfig, engine: EngineHandle, ledger: SharedLedger) -> Self {
        let auth = Arc::new(SessionAuth::new(ledger.clone()));
        let broadcaster = Arc::new(EventBroadcaster::new());

        Self {
            config,
            engine,
            ledger,
            auth,
            broadcaster,
            connection_count: Arc::new(RwLock::new(0)),
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn broadcaster(&self) -> Arc<EventBroadcaster> {
        self.broadcaster.clone()
    }

    /// Start the gateway: broadcaster task, REST surface, session cleanup,
    /// then the WebSocket accept loop (which runs until the process stops).
    pub async fn start(
        &self,
        events: mpsc::UnboundedReceiver<AuctionEvent>,
    ) -> GatewayResult<()> {
        let ws_addr = self
            .config
            .server_addr()
            .map_err(|e| GatewayError::Config(format!("invalid server address: {e}")))?;
        let rest_addr = self
            .config
            .rest_addr()
            .map_err(|e| GatewayError::Config(format!("invalid rest address: {e}")))?;

        {
            let mut running = self.is_running.write().await;
            *running = true;
        }

        tokio::spawn(self.broadcaster.clone().run(events));

        let routes = rest_api::routes(
            self.engine.clone(),
            self.ledger.clone(),
            self.config.admin_token.clone(),
        );
        tokio::spawn(warp::serve(routes).run(rest_addr));
        info!("REST admin surface listening on {}", rest_addr);

        let _cleanup_task = self.start_session_cleanup_task();

        let listener = TcpListener::bind(ws_addr).await?;
        info!("AuctionGateway listening for bidders on {}", ws_addr);

        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    if let Err(e) = self.handle_connection(stream, peer_addr).await {
                        warn!("failed to handle connection from {}: {}", peer_addr, e);
                    }
                }
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection(
        &self,
        stream: tokio::net::TcpStream,
        peer_addr: SocketAddr,
    ) -> GatewayResult<()> {
        {
            let count = self.connection_count.read().await;
            if *count >= self.config.server.max_connections {
                warn!("connection limit reached, rejecting {}", peer_addr);
                return Err(GatewayError::Connection("connection limit exceeded".to_string()));
            }
        }
        {
            let mut count = self.connection_count.write().await;
            *count += 1;
        }

        let mut handler = WebSocketHandler::new(
            peer_addr,
            self.engine.clone(),
            self.auth.clone(),
            self.broadcaster.clone(),
        );

        let connection_count = self.connection_count.clone();
        tokio::spawn(async move {
            if let Err(e) = handler.handle(stream).await {
                warn!("WebSocket handler error: {}", e);
            }
            let mut count = connection_count.write().await;
            *count = count.saturating_sub(1);
        });

        Ok(())
    }

    fn start_session_cleanup_task(&self) -> tokio::task::JoinHandle<()> {
        let auth = self.auth.clone();
        let is_running = self.is_running.clone();
        let ttl = Duration::from_secs(self.config.session_ttl_secs);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                {
                    let running = is_running.read().await;
                    if !*running {
                        break;
                    }
                }
                auth.cleanup_expired(ttl);
            }
        })
    }

    pub async fn stop(&self) -> GatewayResult<()> {
        info!("stopping AuctionGateway...");
        {
            let mut running = self.is_running.write().await;
            *running = false;
        }
        info!("AuctionGateway stopped");
        Ok(())
    }

    pub async fn connection_count(&self) -> usize {
        let count = self.connection_count.read().await;
        *count
    }
}
