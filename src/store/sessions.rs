use std::collections::hash_map::Entry;

use chrono::Utc;
use log::debug;

use crate::error::{Error, Result};
use crate::model::{Session, SessionToken, User, UserId};

use super::memory::MemoryStore;

/// Bearer tokens bound to voters.
pub trait SessionStore {
    /// Start a new session for the user. A user may hold any number of
    /// sessions at once.
    fn issue_token(&self, user_id: UserId) -> Result<SessionToken>;

    /// Look up the user behind a token.
    fn resolve_token(&self, token: &SessionToken) -> Result<User>;

    /// End a session. Revoking an unknown token is not an error.
    fn revoke_token(&self, token: &SessionToken);

    /// Drop every expired session, returning how many were dropped.
    fn purge_expired_sessions(&self) -> usize;
}

impl SessionStore for MemoryStore {
    fn issue_token(&self, user_id: UserId) -> Result<SessionToken> {
        let mut token = SessionToken::generate()?;
        let mut tables = self.write();
        loop {
            match tables.sessions.entry(token) {
                Entry::Vacant(entry) => {
                    let token = entry.key().clone();
                    entry.insert(Session::new(user_id));
                    debug!("Issued {token:?} to user {user_id}");
                    return Ok(token);
                }
                // Never hand out a live token twice.
                Entry::Occupied(_) => token = SessionToken::generate()?,
            }
        }
    }

    fn resolve_token(&self, token: &SessionToken) -> Result<User> {
        let now = Utc::now();
        {
            let tables = self.read();
            let session = tables.sessions.get(token).ok_or(Error::InvalidToken)?;
            if !session.is_expired(self.session_ttl, now) {
                return tables
                    .user(session.user_id)
                    .cloned()
                    .ok_or(Error::UserVanished);
            }
        }

        // Expired: forget it so it can never resolve again.
        let mut tables = self.write();
        if tables
            .sessions
            .get(token)
            .map_or(false, |session| session.is_expired(self.session_ttl, now))
        {
            tables.sessions.remove(token);
            debug!("Expired {token:?}");
        }
        Err(Error::InvalidToken)
    }

    fn revoke_token(&self, token: &SessionToken) {
        if self.write().sessions.remove(token).is_some() {
            debug!("Revoked {token:?}");
        }
    }

    fn purge_expired_sessions(&self) -> usize {
        if self.session_ttl.is_none() {
            return 0;
        }
        let now = Utc::now();
        let mut tables = self.write();
        let before = tables.sessions.len();
        tables
            .sessions
            .retain(|_, session| !session.is_expired(self.session_ttl, now));
        before - tables.sessions.len()
    }
}
