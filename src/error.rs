use argon2::Error as Argon2Error;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a store operation can fail. A failed operation never leaves a
/// partial mutation behind.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not found")]
    NotFound,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User bound to this session no longer exists")]
    UserVanished,
    #[error("Secure random source unavailable")]
    EntropyUnavailable,
    #[error("User has already voted")]
    AlreadyVoted,
    #[error("Candidate not found")]
    UnknownCandidate,
    #[error("Candidates have already been seeded")]
    CandidatesAlreadySeeded,
    #[error(transparent)]
    PasswordHash(#[from] Argon2Error),
}

impl Error {
    /// The HTTP status this error kind maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::MissingField(_)
            | Self::DuplicateUsername
            | Self::AlreadyVoted
            | Self::UnknownCandidate => Status::BadRequest,
            Self::InvalidCredentials | Self::InvalidToken | Self::UserVanished => {
                Status::Unauthorized
            }
            Self::NotFound => Status::NotFound,
            Self::EntropyUnavailable | Self::CandidatesAlreadySeeded | Self::PasswordHash(_) => {
                Status::InternalServerError
            }
        }
    }
}

/// JSON error payload, `{"error": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            log::error!("{self:?}");
        } else {
            log::debug!("{self}");
        }
        // Don't leak internals to the client.
        let message = match self {
            Self::PasswordHash(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Custom(status, Json(ErrorBody::new(message))).respond_to(req)
    }
}
