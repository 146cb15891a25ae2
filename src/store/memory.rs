use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Duration;

use crate::error::Result;
use crate::model::{
    Candidate, CandidateId, HashCost, PasswordHash, Session, SessionToken, UserId, Vote, VoteId,
};

use super::credentials::Account;

/// Password verified against when a login names an unknown user, so that
/// such logins cost as much as real ones.
const DUMMY_PASSWORD: &str = "correct horse battery staple";

/// Every table of the store, guarded as one unit by [`MemoryStore`]'s lock.
///
/// A single lock covers users, candidates, votes, sessions and both ID
/// counters. Casting a vote touches a user and the ledger together, so any
/// narrower lock would have to cover at least that user's record.
#[derive(Default)]
pub(super) struct Tables {
    pub users: BTreeMap<UserId, Account>,
    pub usernames: HashMap<String, UserId>,
    pub candidates: BTreeMap<CandidateId, Candidate>,
    pub votes: BTreeMap<VoteId, Vote>,
    pub sessions: HashMap<SessionToken, Session>,
    pub last_user_id: UserId,
    pub last_vote_id: VoteId,
}

impl Tables {
    pub fn next_user_id(&mut self) -> UserId {
        self.last_user_id += 1;
        self.last_user_id
    }

    pub fn next_vote_id(&mut self) -> VoteId {
        self.last_vote_id += 1;
        self.last_vote_id
    }
}

/// In-process storage. Created once at startup and shared between request
/// handlers; nothing survives a restart.
pub struct MemoryStore {
    tables: RwLock<Tables>,
    pub(super) hash_cost: HashCost,
    pub(super) dummy_hash: PasswordHash,
    pub(super) session_ttl: Option<Duration>,
}

impl MemoryStore {
    /// Create an empty store hashing passwords at the given cost.
    pub fn new(hash_cost: HashCost) -> Result<Self> {
        Ok(Self {
            tables: RwLock::new(Tables::default()),
            hash_cost,
            dummy_hash: PasswordHash::new(DUMMY_PASSWORD, &hash_cost)?,
            session_ttl: None,
        })
    }

    /// Expire sessions once they are older than `ttl`.
    pub fn with_session_ttl(mut self, ttl: impl Into<Option<Duration>>) -> Self {
        self.session_ttl = ttl.into();
        self
    }

    // Write sections only mutate after every fallible check has passed, so a
    // poisoned lock never guards a half-applied change.

    pub(super) fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;
    use crate::model::election::DEFAULT_CANDIDATES;
    use crate::store::ElectionStore;

    impl MemoryStore {
        /// A cheaply-hashing store seeded with the default candidates.
        pub fn example() -> Self {
            let store = Self::new(HashCost::cheap()).unwrap();
            store.seed_candidates(&default_candidates()).unwrap();
            store
        }
    }

    pub fn default_candidates() -> Vec<String> {
        DEFAULT_CANDIDATES.iter().map(|name| name.to_string()).collect()
    }
}
