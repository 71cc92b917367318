//! Message types for the AuctionGateway WebSocket API
//!
//! Requests ride a small envelope (`id`/`method`/`params`); replies echo the
//! id with `result` or `error`; broadcast traffic uses `stream`/`data`
//! frames. The stream names and field spellings here are the wire contract
//! the frontend counts on.

use gavel::{AuctionEvent, EpochMs, Points, StatusSnapshot};
use serde::{Deserialize, Serialize};

/// Base message structure for all WebSocket messages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message ID for request/response correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Method (for requests) or stream name (for broadcast frames)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,

    /// Parameters (for requests) or data (for broadcast frames)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Result (for successful responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// Error (for error responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMessage>,
}

/// Error message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Stable machine-readable code
    pub code: String,

    /// Human-readable message
    pub message: String,
}

impl Message {
    pub fn result(id: Option<String>, result: serde_json::Value) -> Self {
        Self { id, result: Some(result), ..Self::default() }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            id,
            error: Some(ErrorMessage { code: code.to_string(), message: message.into() }),
            ..Self::default()
        }
    }

    pub fn stream(stream: &str, data: serde_json::Value) -> Self {
        Self { stream: Some(stream.to_string()), data: Some(data), ..Self::default() }
    }
}

/// `auth.login` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub team_id: String,
}

/// `auth.login` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub team_id: String,
    pub team_name: String,
    pub points: Points,
}

/// `auth.resume` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRequest {
    pub token: String,
}

/// `bid.place` request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidPlaceRequest {
    pub amount: Points,
}

/// Successful `bid.place` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidAccepted {
    pub status: String,
    pub new_balance: Points,
    pub timer_extended: bool,
    pub end_time: EpochMs,
}

/// Rejected `bid.place` response; sent only to the bidder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidRejected {
    pub status: String,
    pub reason: String,
    pub message: String,
}

/// `auction.status` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStatusDto {
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_bid: Option<Points>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_leader: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<EpochMs>,
}

impl AuctionStatusDto {
    /// Remaining time is derived from `end_time` at serve time, never stored.
    pub fn from_snapshot(snapshot: &StatusSnapshot, now: EpochMs) -> Self {
        match &snapshot.active {
            None => Self {
                is_active: false,
                item_id: None,
                item_name: None,
                current_bid: None,
                current_leader: None,
                time_remaining_ms: None,
                end_time: None,
            },
            Some(running) => Self {
                is_active: true,
                item_id: Some(running.item_id.clone()),
                item_name: Some(running.item_name.clone()),
                current_bid: Some(running.highest_bid),
                current_leader: running.leader.clone(),
                time_remaining_ms: Some(running.time_remaining_ms(now)),
                end_time: Some(running.end_time),
            },
        }
    }
}

// Broadcast payloads. One struct per stream so the field spellings are
// locked down by serde rather than hand-built json.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStartedData {
    pub item_id: String,
    pub item_name: String,
    pub starting_price: Points,
    pub end_time: EpochMs,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidUpdateData {
    pub item_id: String,
    pub new_bid: Points,
    pub old_bid: Points,
    pub leader_id: String,
    pub timer_extended: bool,
    pub time_remaining_ms: u64,
    pub timestamp: EpochMs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdateData {
    pub item_id: String,
    pub time_remaining_ms: u64,
    pub end_time: EpochMs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerExtendedData {
    pub item_id: String,
    pub new_end_time: EpochMs,
    pub added_ms: u64,
    pub time_remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionEndedData {
    pub item_id: String,
    pub winning_bid: Points,
    /// null when the round ended without a bid
    pub winner_id: Option<String>,
    pub timestamp: EpochMs,
}

/// Turn an engine event into the broadcast frame observers receive.
pub fn broadcast_frame(event: &AuctionEvent) -> Message {
    match event {
        AuctionEvent::Started(ev) => Message::stream(
            "auction:started",
            serde_json::json!(AuctionStartedData {
                item_id: ev.item_id.clone(),
                item_name: ev.item_name.clone(),
                starting_price: ev.starting_price,
                end_time: ev.end_time,
                duration_ms: ev.duration_ms,
            }),
        ),
        AuctionEvent::BidUpdate(ev) => Message::stream(
            "bid:update",
            serde_json::json!(BidUpdateData {
                item_id: ev.item_id.clone(),
                new_bid: ev.new_bid,
                old_bid: ev.old_bid,
                leader_id: ev.leader.clone(),
                timer_extended: ev.timer_extended,
                time_remaining_ms: ev.time_remaining_ms,
                timestamp: ev.timestamp,
            }),
        ),
        AuctionEvent::TimerUpdate(ev) => Message::stream(
            "timer:update",
            serde_json::json!(TimerUpdateData {
                item_id: ev.item_id.clone(),
                time_remaining_ms: ev.time_remaining_ms,
                end_time: ev.end_time,
            }),
        ),
        AuctionEvent::TimerExtended(ev) => Message::stream(
            "timer:extended",
            serde_json::json!(TimerExtendedData {
                item_id: ev.item_id.clone(),
                new_end_time: ev.new_end_time,
                added_ms: ev.added_ms,
                time_remaining_ms: ev.time_remaining_ms,
            }),
        ),
        AuctionEvent::Ended(ev) => Message::stream(
            "auction:ended",
            serde_json::json!(AuctionEndedData {
                item_id: ev.item_id.clone(),
                winning_bid: ev.winning_bid,
                winner_id: ev.winner.clone(),
                timestamp: ev.timestamp,
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel::{EvBidUpdate, EvEnded, EvStarted};

    #[test]
    fn bid_update_frame_uses_the_contract_spellings() {
        let frame = broadcast_frame(&AuctionEvent::BidUpdate(EvBidUpdate {
            item_id: "item-x".into(),
            new_bid: 60,
            old_bid: 50,
            leader: "team-b".into(),
            prior_leader: Some("team-a".into()),
            timer_extended: true,
            time_remaining_ms: 2_200,
            timestamp: 104_000,
        }));

        assert_eq!(frame.stream.as_deref(), Some("bid:update"));
        let data = frame.data.unwrap();
        assert_eq!(data["itemId"], "item-x");
        assert_eq!(data["newBid"], 60);
        assert_eq!(data["oldBid"], 50);
        assert_eq!(data["leaderId"], "team-b");
        assert_eq!(data["timerExtended"], true);
        assert_eq!(data["timeRemainingMs"], 2_200);
        assert_eq!(data["timestamp"], 104_000);
    }

    #[test]
    fn ended_frame_reports_null_winner() {
        let frame = broadcast_frame(&AuctionEvent::Ended(EvEnded {
            item_id: "item-x".into(),
            winning_bid: 0,
            winner: None,
            timestamp: 105_000,
        }));

        assert_eq!(frame.stream.as_deref(), Some("auction:ended"));
        let data = frame.data.unwrap();
        assert_eq!(data["winningBid"], 0);
        assert!(data["winnerId"].is_null());
    }

    #[test]
    fn started_frame_round_trips_through_the_envelope() {
        let frame = broadcast_frame(&AuctionEvent::Started(EvStarted {
            item_id: "item-x".into(),
            item_name: "Trophy".into(),
            starting_price: 10,
            start_time: 100_000,
            end_time: 105_000,
            duration_ms: 5_000,
        }));

        let text = serde_json::to_string(&frame).unwrap();
        let parsed: Message = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.stream.as_deref(), Some("auction:started"));
        assert_eq!(parsed.data.unwrap()["durationMs"], 5_000);
        // Request-only fields stay off the wire entirely.
        assert!(!text.contains("\"method\""));
        assert!(!text.contains("\"error\""));
    }

    #[test]
    fn idle_status_serializes_to_the_bare_flag() {
        let dto = AuctionStatusDto::from_snapshot(&StatusSnapshot::default(), 0);
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value, serde_json::json!({ "isActive": false }));
    }
}
