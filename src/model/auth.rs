use std::ops::Deref;

use rocket::{
    http::Status,
    request::{self, FromRequest, Request},
};

use crate::error::Error;

use super::SessionToken;

pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Accepted `Authorization` schemes.
const SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// The session token carried by a request, as `Authorization: Token <token>`.
/// This only extracts the token; whether it names a live session is up to
/// the store.
#[derive(Debug)]
pub struct BearerToken(SessionToken);

impl BearerToken {
    /// Parse an `Authorization` header value.
    pub fn parse(header: &str) -> Option<Self> {
        let (scheme, token) = header.trim().split_once(' ')?;
        let token = token.trim();
        if !SCHEMES.contains(&scheme) || token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        Some(Self(SessionToken::from(token)))
    }
}

impl Deref for BearerToken {
    type Target = SessionToken;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BearerToken {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        match req
            .headers()
            .get_one(AUTHORIZATION_HEADER)
            .and_then(Self::parse)
        {
            Some(token) => request::Outcome::Success(token),
            None => request::Outcome::Failure((Status::Unauthorized, Error::InvalidToken)),
        }
    }
}
