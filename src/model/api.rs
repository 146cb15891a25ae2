//! Request and response bodies of the HTTP API.

use serde::{Deserialize, Serialize};

use super::{CandidateId, SessionToken, User};

/// Absent fields read as empty, so they are reported as missing rather than
/// as a malformed body.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: SessionToken,
    pub user: User,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct VoteRequest {
    #[serde(rename = "candidate")]
    pub candidate_id: CandidateId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
