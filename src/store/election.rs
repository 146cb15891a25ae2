use chrono::Utc;
use log::info;

use crate::error::{Error, Result};
use crate::model::{Candidate, CandidateId, UserId, Vote};

use super::memory::{MemoryStore, Tables};

/// Candidates and the vote ledger.
pub trait ElectionStore {
    /// Install the candidates, numbered from 1 in the given order. This is
    /// a one-off startup step; it fails if candidates already exist.
    fn seed_candidates(&self, names: &[String]) -> Result<Vec<Candidate>>;

    /// All candidates, in ID order.
    fn list_candidates(&self) -> Vec<Candidate>;

    /// Record the user's vote. Each user gets exactly one; the vote and the
    /// user's has-voted flag are committed together or not at all.
    fn cast_vote(&self, user_id: UserId, candidate_id: CandidateId) -> Result<Vote>;

    /// A snapshot of every vote, in ID order.
    fn tally(&self) -> Vec<Vote>;
}

impl Tables {
    /// The whole check-then-record sequence of a vote. Must run under one
    /// write guard.
    fn record_vote(&mut self, user_id: UserId, candidate_id: CandidateId) -> Result<Vote> {
        let user = self.user(user_id).ok_or(Error::NotFound)?;
        if user.has_voted {
            return Err(Error::AlreadyVoted);
        }
        if !self.candidates.contains_key(&candidate_id) {
            return Err(Error::UnknownCandidate);
        }

        // The user exists, so this cannot fail.
        self.mark_voted(user_id)?;
        let vote = Vote {
            id: self.next_vote_id(),
            user_id,
            candidate_id,
            created_at: Utc::now(),
        };
        self.votes.insert(vote.id, vote.clone());
        Ok(vote)
    }
}

impl ElectionStore for MemoryStore {
    fn seed_candidates(&self, names: &[String]) -> Result<Vec<Candidate>> {
        let mut tables = self.write();
        if !tables.candidates.is_empty() {
            return Err(Error::CandidatesAlreadySeeded);
        }
        let candidates: Vec<Candidate> = names
            .iter()
            .zip(1..)
            .map(|(name, id)| Candidate {
                id,
                name: name.clone(),
            })
            .collect();
        tables
            .candidates
            .extend(candidates.iter().map(|c| (c.id, c.clone())));
        info!("Seeded {} candidates", candidates.len());
        Ok(candidates)
    }

    fn list_candidates(&self) -> Vec<Candidate> {
        self.read().candidates.values().cloned().collect()
    }

    fn cast_vote(&self, user_id: UserId, candidate_id: CandidateId) -> Result<Vote> {
        let vote = self.write().record_vote(user_id, candidate_id)?;
        info!(
            "Recorded vote {} from user {} for candidate {}",
            vote.id, user_id, candidate_id
        );
        Ok(vote)
    }

    fn tally(&self) -> Vec<Vote> {
        self.read().votes.values().cloned().collect()
    }
}
