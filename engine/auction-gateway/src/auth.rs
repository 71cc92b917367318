//! Bidder session management
//!
//! The engine never sees tokens - it deals in team ids. This module is the
//! authentication collaborator that turns a session token back into a team
//! identity. Credential verification beyond "the team exists" is out of
//! scope; sessions are uuid tokens with an idle expiry.

use crate::{GatewayError, GatewayResult};
use gavel::TeamId;
use parking_lot::RwLock;
use point_ledger::{Ledger, SharedLedger, TeamRecord};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Resolves a bidder token to a team identity
pub trait BidderAuth: Send + Sync {
    fn resolve(&self, token: &str) -> Option<TeamId>;
}

struct Session {
    team_id: TeamId,
    last_seen: Instant,
}

/// Token sessions backed by the ledger's team records
pub struct SessionAuth {
    ledger: SharedLedger,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionAuth {
    pub fn new(ledger: SharedLedger) -> Self {
        Self { ledger, sessions: RwLock::new(HashMap::new()) }
    }

    /// Open a session for a team. Fails for teams the ledger does not know.
    pub fn login(&self, team_id: &str) -> GatewayResult<(String, TeamRecord)> {
        let team = self
            .ledger
            .team(team_id)
            .map_err(|_| GatewayError::Authentication(format!("unknown team: {team_id}")))?;

        let token = Uuid::new_v4().to_string();
        self.sessions.write().insert(
            token.clone(),
            Session { team_id: team.id.clone(), last_seen: Instant::now() },
        );
        info!(team = %team.id, "bidder session opened");
        Ok((token, team))
    }

    /// Drop sessions idle longer than `ttl`. Returns how many were removed.
    pub fn cleanup_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() <= ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "expired bidder sessions dropped");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

impl BidderAuth for SessionAuth {
    fn resolve(&self, token: &str) -> Option<TeamId> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(token)?;
        session.last_seen = Instant::now();
        Some(session.team_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use point_ledger::InMemoryLedger;
    use point_ledger::Ledger;
    use std::sync::Arc;

    fn auth_with_team() -> SessionAuth {
        let ledger = InMemoryLedger::new();
        ledger.create_team(TeamRecord::new("team-a", "Alpha", vec![])).unwrap();
        SessionAuth::new(Arc::new(ledger))
    }

    #[test]
    fn login_resolves_back_to_the_team() {
        let auth = auth_with_team();
        let (token, team) = auth.login("team-a").unwrap();
        assert_eq!(team.name, "Alpha");
        assert_eq!(auth.resolve(&token).as_deref(), Some("team-a"));
        assert_eq!(auth.resolve("not-a-token"), None);
    }

    #[test]
    fn unknown_team_cannot_log_in() {
        let auth = auth_with_team();
        assert!(auth.login("team-z").is_err());
        assert_eq!(auth.session_count(), 0);
    }

    #[test]
    fn idle_sessions_expire() {
        let auth = auth_with_team();
        let (token, _) = auth.login("team-a").unwrap();
        assert_eq!(auth.cleanup_expired(Duration::from_secs(60)), 0);
        assert_eq!(auth.cleanup_expired(Duration::ZERO), 1);
        assert_eq!(auth.resolve(&token), None);
    }
}
