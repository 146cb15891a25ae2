pub mod api;
pub mod auth;
pub mod election;
pub mod password;
pub mod session;
pub mod user;

pub use election::{Candidate, CandidateTotal, Vote};
pub use password::{HashCost, PasswordHash};
pub use session::{Session, SessionToken};
pub use user::User;

/// User IDs are sequential integers starting at 1.
pub type UserId = u64;
/// Candidate IDs are assigned in seeding order, starting at 1.
pub type CandidateId = u64;
/// Vote IDs are sequential integers starting at 1.
pub type VoteId = u64;
