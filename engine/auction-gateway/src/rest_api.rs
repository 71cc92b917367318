//! REST admin surface for the AuctionGateway
//!
//! Staff drive the auction from here: start/end rounds, award and deduct
//! points, inspect the leaderboard and the auction history. Public listings
//! (available items, all items) and the health probe live here too. Every
//! admin route requires the configured bearer token; handlers reply with
//! uniform `{success, ...}` bodies or an error object with a stable code.

use crate::messages::AuctionStatusDto;
use auction_clock::now_ms;
use gavel::{AuctionError, EngineHandle, StartAuction};
use point_ledger::{ItemRecord, Ledger, LedgerError, SharedLedger, TeamRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub timestamp: String,
}

/// Error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAuctionBody {
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBody {
    pub team_id: String,
    pub points: u64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamBody {
    pub team_id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemBody {
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub starting_price: u64,
}

/// Build the full REST route tree.
pub fn routes(
    engine: EngineHandle,
    ledger: SharedLedger,
    admin_token: String,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let available_items = warp::path!("api" / "products" / "available")
        .and(warp::get())
        .and(with_ledger(ledger.clone()))
        .and_then(list_available_items);

    let all_items = warp::path!("api" / "products")
        .and(warp::get())
        .and(with_ledger(ledger.clone()))
        .and_then(list_all_items);

    let start_auction = warp::path!("api" / "admin" / "start-auction" / String)
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_engine(engine.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(start_auction_handler);

    let end_auction = warp::path!("api" / "admin" / "end-auction")
        .and(warp::post())
        .and(auth_header())
        .and(with_engine(engine.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(end_auction_handler);

    let auction_status = warp::path!("api" / "admin" / "auction-status")
        .and(warp::get())
        .and(auth_header())
        .and(with_engine(engine))
        .and(with_token(admin_token.clone()))
        .and_then(auction_status_handler);

    let award_points = warp::path!("api" / "admin" / "award-points")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_ledger(ledger.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(award_points_handler);

    let deduct_points = warp::path!("api" / "admin" / "deduct-points")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_ledger(ledger.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(deduct_points_handler);

    let list_teams = warp::path!("api" / "admin" / "teams")
        .and(warp::get())
        .and(auth_header())
        .and(with_ledger(ledger.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(list_teams_handler);

    let history = warp::path!("api" / "admin" / "auction-history")
        .and(warp::get())
        .and(auth_header())
        .and(with_ledger(ledger.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(auction_history_handler);

    let create_team = warp::path!("api" / "admin" / "teams")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_ledger(ledger.clone()))
        .and(with_token(admin_token.clone()))
        .and_then(create_team_handler);

    let create_item = warp::path!("api" / "admin" / "products")
        .and(warp::post())
        .and(auth_header())
        .and(warp::body::json())
        .and(with_ledger(ledger))
        .and(with_token(admin_token))
        .and_then(create_item_handler);

    health
        .or(available_items)
        .or(all_items)
        .or(start_auction)
        .or(end_auction)
        .or(auction_status)
        .or(award_points)
        .or(deduct_points)
        .or(list_teams)
        .or(history)
        .or(create_team)
        .or(create_item)
}

fn with_engine(
    engine: EngineHandle,
) -> impl Filter<Extract = (EngineHandle,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

fn with_ledger(
    ledger: SharedLedger,
) -> impl Filter<Extract = (SharedLedger,), Error = Infallible> + Clone {
    warp::any().map(move || ledger.clone())
}

fn with_token(token: String) -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::any().map(move || token.clone())
}

fn auth_header() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
}

fn admin_ok(expected: &str, header: Option<&String>) -> bool {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == expected)
        .unwrap_or(false)
}

fn unauthorized() -> WithStatus<Json> {
    warp::reply::with_status(
        error_body("unauthorized", "missing or invalid admin token"),
        StatusCode::UNAUTHORIZED,
    )
}

fn error_body(code: &str, message: impl Into<String>) -> Json {
    warp::reply::json(&ErrorResponse {
        error: ErrorDetail { code: code.to_string(), message: message.into() },
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn ok_json(body: serde_json::Value) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
}

fn auction_error_reply(err: &AuctionError) -> WithStatus<Json> {
    let status = match err {
        AuctionError::Conflict { .. } | AuctionError::AlreadySettled { .. } => StatusCode::CONFLICT,
        AuctionError::ItemNotFound { .. } | AuctionError::TeamNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        AuctionError::NoActiveAuction
        | AuctionError::BidTooLow { .. }
        | AuctionError::InsufficientFunds { .. } => StatusCode::BAD_REQUEST,
        AuctionError::Ledger | AuctionError::EngineClosed => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warp::reply::with_status(error_body(err.reason(), err.to_string()), status)
}

fn ledger_error_reply(err: &LedgerError) -> WithStatus<Json> {
    let (status, code) = match err {
        LedgerError::TeamNotFound { .. } => (StatusCode::NOT_FOUND, "team_not_found"),
        LedgerError::ItemNotFound { .. } => (StatusCode::NOT_FOUND, "item_not_found"),
        LedgerError::InsufficientPoints { .. } => (StatusCode::BAD_REQUEST, "insufficient_points"),
        LedgerError::AlreadySettled { .. } => (StatusCode::CONFLICT, "item_already_settled"),
        LedgerError::DuplicateTeam { .. } => (StatusCode::CONFLICT, "duplicate_team"),
        LedgerError::DuplicateItem { .. } => (StatusCode::CONFLICT, "duplicate_item"),
        LedgerError::ZeroPoints => (StatusCode::BAD_REQUEST, "zero_points"),
    };
    warp::reply::with_status(error_body(code, err.to_string()), status)
}

async fn list_available_items(ledger: SharedLedger) -> Result<WithStatus<Json>, Infallible> {
    let products = ledger.available_items();
    Ok(ok_json(json!({
        "success": true,
        "count": products.len(),
        "products": products,
    })))
}

async fn list_all_items(ledger: SharedLedger) -> Result<WithStatus<Json>, Infallible> {
    let mut available = ledger.available_items();
    available.extend(ledger.settled_items());
    let products: Vec<_> = available
        .iter()
        .map(|item| {
            json!({
                "productId": item.id,
                "name": item.name,
                "description": item.description,
                "startingPrice": item.starting_price,
                "highestBid": item.highest_bid,
                "status": if item.is_settled() { "completed" } else { "available" },
                "winner": item.winner,
            })
        })
        .collect();
    Ok(ok_json(json!({
        "success": true,
        "count": products.len(),
        "products": products,
    })))
}

async fn start_auction_handler(
    item_id: String,
    auth: Option<String>,
    body: StartAuctionBody,
    engine: EngineHandle,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    match engine
        .start_auction(StartAuction { item_id, duration_ms: body.duration_ms })
        .await
    {
        Ok(started) => Ok(ok_json(json!({
            "success": true,
            "message": format!("Auction started for {}", started.item_name),
            "auction": {
                "round": started.round,
                "itemId": started.item_id,
                "itemName": started.item_name,
                "startingPrice": started.starting_price,
                "durationMs": started.duration_ms,
                "endTime": started.end_time,
            },
        }))),
        Err(err) => Ok(auction_error_reply(&err)),
    }
}

async fn end_auction_handler(
    auth: Option<String>,
    engine: EngineHandle,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    match engine.end_auction().await {
        Ok(summary) => Ok(ok_json(json!({
            "success": true,
            "message": "Auction ended manually",
            "result": {
                "itemId": summary.item_id,
                "itemName": summary.item_name,
                "winningBid": summary.winning_bid,
                "winner": summary.winner,
                "settledAt": summary.settled_at,
            },
        }))),
        Err(err) => Ok(auction_error_reply(&err)),
    }
}

async fn auction_status_handler(
    auth: Option<String>,
    engine: EngineHandle,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    let status = AuctionStatusDto::from_snapshot(&engine.status(), now_ms());
    Ok(ok_json(json!(status)))
}

async fn award_points_handler(
    auth: Option<String>,
    body: PointsBody,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    match ledger.award_points(&body.team_id, body.points) {
        Ok(new_balance) => Ok(ok_json(json!({
            "success": true,
            "message": format!("{} points awarded to {}", body.points, body.team_id),
            "team": { "id": body.team_id, "newBalance": new_balance },
            "reason": body.reason.unwrap_or_else(|| "Admin award".to_string()),
        }))),
        Err(err) => Ok(ledger_error_reply(&err)),
    }
}

async fn deduct_points_handler(
    auth: Option<String>,
    body: PointsBody,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    match ledger.deduct_points(&body.team_id, body.points) {
        Ok(new_balance) => Ok(ok_json(json!({
            "success": true,
            "message": format!("{} points deducted from {}", body.points, body.team_id),
            "team": { "id": body.team_id, "newBalance": new_balance },
            "reason": body.reason.unwrap_or_else(|| "Admin deduction".to_string()),
        }))),
        Err(err) => Ok(ledger_error_reply(&err)),
    }
}

async fn list_teams_handler(
    auth: Option<String>,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    let teams = ledger.teams_by_points();
    Ok(ok_json(json!({
        "success": true,
        "count": teams.len(),
        "teams": teams,
    })))
}

async fn auction_history_handler(
    auth: Option<String>,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    let settled = ledger.settled_items();
    let auctions: Vec<_> = settled
        .iter()
        .map(|item| {
            json!({
                "productId": item.id,
                "productName": item.name,
                "winningBid": item.highest_bid,
                "winner": item.winner,
                "completedAt": item.settled_at,
            })
        })
        .collect();
    Ok(ok_json(json!({
        "success": true,
        "count": auctions.len(),
        "auctions": auctions,
    })))
}

async fn create_team_handler(
    auth: Option<String>,
    body: CreateTeamBody,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    let team = TeamRecord::new(body.team_id, body.name, body.members);
    match ledger.create_team(team.clone()) {
        Ok(()) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({
                "success": true,
                "message": "Team created successfully",
                "team": team,
            })),
            StatusCode::CREATED,
        )),
        Err(err) => Ok(ledger_error_reply(&err)),
    }
}

async fn create_item_handler(
    auth: Option<String>,
    body: CreateItemBody,
    ledger: SharedLedger,
    token: String,
) -> Result<WithStatus<Json>, Infallible> {
    if !admin_ok(&token, auth.as_ref()) {
        return Ok(unauthorized());
    }
    let item = ItemRecord::new(body.item_id, body.name, body.description, body.starting_price);
    match ledger.create_item(item.clone()) {
        Ok(()) => Ok(warp::reply::with_status(
            warp::reply::json(&json!({
                "success": true,
                "message": "Product created successfully",
                "product": item,
            })),
            StatusCode::CREATED,
        )),
        Err(err) => Ok(ledger_error_reply(&err)),
    }
}
