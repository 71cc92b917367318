//! WebSocket connection handler for the AuctionGateway

use crate::auth::{BidderAuth, SessionAuth};
use crate::broadcaster::EventBroadcaster;
use crate::error::{GatewayError, GatewayResult};
use crate::messages::{
    AuctionStatusDto, BidAccepted, BidPlaceRequest, BidRejected, LoginRequest, LoginResponse,
    Message as ApiMessage, ResumeRequest,
};

use auction_clock::now_ms;
use futures_util::{SinkExt, StreamExt};
use gavel::{EngineHandle, TeamId};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket connection handler
pub struct WebSocketHandler {
    peer_addr: SocketAddr,
    engine: EngineHandle,
    auth: Arc<SessionAuth>,
    broadcaster: Arc<EventBroadcaster>,
    /// Identifies this connection in the broadcaster's client map.
    client_id: String,
    sender: Option<mpsc::UnboundedSender<WsMessage>>,
    /// Set once `auth.login` succeeds.
    team: Option<TeamId>,
}

impl WebSocketHandler {
    pub fn new(
        peer_addr: SocketAddr,
        engine: EngineHandle,
        auth: Arc<SessionAuth>,
        broadcaster: Arc<EventBroadcaster>,
    ) -> Self {
        Self {
            peer_addr,
            engine,
            auth,
            broadcaster,
            client_id: Uuid::new_v4().to_string(),
            sender: None,
            team: None,
        }
    }

    /// Handle the WebSocket connection until the peer goes away.
    pub async fn handle(&mut self, stream: TcpStream) -> GatewayResult<()> {
        debug!("handling WebSocket connection from {}", self.peer_addr);

        let ws_stream = accept_async(stream).await?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        // All outbound traffic (replies and broadcast frames) funnels
        // through one queue so it cannot interleave mid-frame.
        let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
        self.sender = Some(tx);

        let sender_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(err) = ws_sender.send(message).await {
                    debug!(error = %err, "failed to send WebSocket message");
                    break;
                }
            }
        });

        while let Some(message) = ws_receiver.next().await {
            match message {
                Ok(message) => {
                    // Handlers reply to the peer themselves; the error here
                    // is only for the log.
                    if let Err(err) = self.handle_message(message).await {
                        warn!(peer = %self.peer_addr, error = %err, "failed to handle message");
                    }
                }
                Err(err) => {
                    debug!(peer = %self.peer_addr, error = %err, "WebSocket error");
                    break;
                }
            }
        }

        self.broadcaster.remove_client(&self.client_id);
        sender_task.abort();
        info!("WebSocket connection from {} closed", self.peer_addr);
        Ok(())
    }

    async fn handle_message(&mut self, message: WsMessage) -> GatewayResult<()> {
        match message {
            WsMessage::Text(text) => self.handle_text_message(text).await,
            WsMessage::Ping(data) => {
                self.send_raw(WsMessage::Pong(data));
                Ok(())
            }
            WsMessage::Close(_) => {
                debug!("close frame from {}", self.peer_addr);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn handle_text_message(&mut self, text: String) -> GatewayResult<()> {
        let message: ApiMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(err) => {
                self.send_error(None, "bad_request", &err.to_string());
                return Err(err.into());
            }
        };

        match message.method.as_deref() {
            Some("auth.login") => self.handle_login(message),
            Some("auth.resume") => self.handle_resume(message),
            Some("auction.subscribe") => self.handle_subscribe(message),
            Some("auction.status") => self.handle_status(message),
            Some("bid.place") => self.handle_bid(message).await,
            other => {
                let method = other.unwrap_or("<none>").to_string();
                self.send_error(message.id, "unknown_method", &method);
                Err(GatewayError::UnknownMethod(method))
            }
        }
    }

    fn handle_login(&mut self, mut message: ApiMessage) -> GatewayResult<()> {
        let Some(request) = self.take_params::<LoginRequest>(&mut message) else {
            return Ok(());
        };

        match self.auth.login(&request.team_id) {
            Ok((token, team)) => {
                self.team = Some(team.id.clone());
                let response = LoginResponse {
                    token,
                    team_id: team.id,
                    team_name: team.name,
                    points: team.points,
                };
                self.send_result(message.id, serde_json::to_value(response)?);
            }
            Err(err) => {
                self.send_error(message.id, "auth_failed", &err.to_string());
            }
        }
        Ok(())
    }

    /// Re-attach an existing session token to this connection, e.g. after a
    /// reconnect.
    fn handle_resume(&mut self, mut message: ApiMessage) -> GatewayResult<()> {
        let Some(request) = self.take_params::<ResumeRequest>(&mut message) else {
            return Ok(());
        };

        match self.auth.resolve(&request.token) {
            Some(team_id) => {
                self.team = Some(team_id.clone());
                self.send_result(message.id, serde_json::json!({ "teamId": team_id }));
            }
            None => {
                self.send_error(message.id, "auth_failed", "unknown or expired token");
            }
        }
        Ok(())
    }

    /// Attach this connection to the broadcast stream. Spectating needs no
    /// login; only bidding does.
    fn handle_subscribe(&mut self, message: ApiMessage) -> GatewayResult<()> {
        let Some(sender) = &self.sender else {
            return Err(GatewayError::Connection("no outbound queue".to_string()));
        };
        self.broadcaster.add_client(self.client_id.clone(), sender.clone());
        self.send_result(message.id, serde_json::json!({ "subscribed": true }));
        Ok(())
    }

    fn handle_status(&mut self, message: ApiMessage) -> GatewayResult<()> {
        let status = AuctionStatusDto::from_snapshot(&self.engine.status(), now_ms());
        self.send_result(message.id, serde_json::to_value(status)?);
        Ok(())
    }

    async fn handle_bid(&mut self, mut message: ApiMessage) -> GatewayResult<()> {
        let Some(team_id) = self.team.clone() else {
            self.send_error(message.id, "not_authenticated", "log in before bidding");
            return Ok(());
        };
        let Some(request) = self.take_params::<BidPlaceRequest>(&mut message) else {
            return Ok(());
        };

        // A rejection is a normal reply to this bidder, not a broadcast and
        // not a transport error.
        match self.engine.place_bid(team_id, request.amount).await {
            Ok(receipt) => {
                let accepted = BidAccepted {
                    status: "accepted".to_string(),
                    new_balance: receipt.new_balance,
                    timer_extended: receipt.timer_extended,
                    end_time: receipt.end_time,
                };
                self.send_result(message.id, serde_json::to_value(accepted)?);
            }
            Err(err) => {
                let rejected = BidRejected {
                    status: "rejected".to_string(),
                    reason: err.reason().to_string(),
                    message: err.to_string(),
                };
                self.send_result(message.id, serde_json::to_value(rejected)?);
            }
        }
        Ok(())
    }

    /// Parse a request's params, replying with `invalid_params` on failure.
    fn take_params<T: serde::de::DeserializeOwned>(&self, message: &mut ApiMessage) -> Option<T> {
        match parse_params(message.params.take()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                self.send_error(message.id.clone(), "invalid_params", &err.to_string());
                None
            }
        }
    }

    fn send_result(&self, id: Option<String>, result: serde_json::Value) {
        self.send_json(ApiMessage::result(id, result));
    }

    fn send_error(&self, id: Option<String>, code: &str, detail: &str) {
        self.send_json(ApiMessage::error(id, code, detail));
    }

    fn send_json(&self, message: ApiMessage) {
        match serde_json::to_string(&message) {
            Ok(text) => self.send_raw(WsMessage::Text(text)),
            Err(err) => error!(error = %err, "failed to serialize reply"),
        }
    }

    fn send_raw(&self, message: WsMessage) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(message);
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<serde_json::Value>,
) -> GatewayResult<T> {
    let params = params.ok_or_else(|| GatewayError::InvalidParams("missing params".into()))?;
    serde_json::from_value(params).map_err(|err| GatewayError::InvalidParams(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_params_requires_a_body() {
        let err = parse_params::<BidPlaceRequest>(None).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));

        let parsed: BidPlaceRequest =
            parse_params(Some(serde_json::json!({ "amount": 60 }))).unwrap();
        assert_eq!(parsed.amount, 60);
    }
}
