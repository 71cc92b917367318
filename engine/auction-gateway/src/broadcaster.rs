//! Event broadcasting for the AuctionGateway
//!
//! One task consumes the engine's event channel. Each event is serialized
//! once and pushed to every observer's outbound queue before the next event
//! is read, so every observer sees events in exactly the order the engine
//! produced them. This module never touches auction state.

use crate::messages::broadcast_frame;
use gavel::AuctionEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error};

/// Fan-out of auction events to connected observers
pub struct EventBroadcaster {
    /// Connected observers (client id -> outbound WebSocket queue)
    clients: RwLock<HashMap<String, mpsc::UnboundedSender<WsMessage>>>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self { clients: RwLock::new(HashMap::new()) }
    }

    /// Attach an observer to the broadcast stream.
    pub fn add_client(&self, client_id: String, sender: mpsc::UnboundedSender<WsMessage>) {
        self.clients.write().insert(client_id, sender);
    }

    pub fn remove_client(&self, client_id: &str) {
        self.clients.write().remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Consume the engine's event stream until it closes.
    pub async fn run(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<AuctionEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(&event);
        }
        debug!("event channel closed, broadcaster stopping");
    }

    fn dispatch(&self, event: &AuctionEvent) {
        let frame = broadcast_frame(event);
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "failed to serialize broadcast frame");
                return;
            }
        };
        let message = WsMessage::Text(text);

        let mut dead = Vec::new();
        {
            let clients = self.clients.read();
            for (client_id, sender) in clients.iter() {
                if sender.send(message.clone()).is_err() {
                    dead.push(client_id.clone());
                }
            }
        }
        if !dead.is_empty() {
            let mut clients = self.clients.write();
            for client_id in dead {
                clients.remove(&client_id);
                debug!(client = %client_id, "removed disconnected observer");
            }
        }
    }
}
