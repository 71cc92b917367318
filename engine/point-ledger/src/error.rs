//! Error types for PointLedger

use crate::{ItemId, Points, TeamId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("team not found: {team_id}")]
    TeamNotFound { team_id: TeamId },

    #[error("item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    #[error("insufficient points: required {required}, available {available}")]
    InsufficientPoints { required: Points, available: Points },

    #[error("item already settled: {item_id}")]
    AlreadySettled { item_id: ItemId },

    #[error("team already exists: {team_id}")]
    DuplicateTeam { team_id: TeamId },

    #[error("item already exists: {item_id}")]
    DuplicateItem { item_id: ItemId },

    #[error("points amount must be positive")]
    ZeroPoints,
}
