use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateId, UserId, VoteId};

/// The names seeded when no candidates are configured.
pub const DEFAULT_CANDIDATES: [&str; 3] = ["Alice Johnson", "Bob Smith", "Charlie Brown"];

/// A fixed option on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

/// One voter's one vote. Never modified once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub user_id: UserId,
    pub candidate_id: CandidateId,
    pub created_at: DateTime<Utc>,
}

/// Number of votes one candidate received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTotal {
    pub candidate_id: CandidateId,
    pub name: String,
    pub votes: u64,
}

impl CandidateTotal {
    /// Count a tally snapshot per candidate. Every candidate is listed, in ID
    /// order, including those nobody voted for.
    pub fn count(candidates: &[Candidate], votes: &[Vote]) -> Vec<Self> {
        let mut counts: BTreeMap<CandidateId, u64> = candidates.iter().map(|c| (c.id, 0)).collect();
        for vote in votes {
            if let Some(count) = counts.get_mut(&vote.candidate_id) {
                *count += 1;
            }
        }

        let mut totals: Vec<Self> = candidates
            .iter()
            .map(|candidate| Self {
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                votes: counts.get(&candidate.id).copied().unwrap_or_default(),
            })
            .collect();
        totals.sort_by_key(|total| total.candidate_id);
        totals
    }
}
