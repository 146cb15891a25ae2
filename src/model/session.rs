use std::fmt::{Debug, Display, Formatter};

use chrono::{DateTime, Duration, Utc};
use data_encoding::HEXLOWER;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::UserId;

/// Bytes of OS randomness behind every token: 256 bits.
pub const TOKEN_BYTES: usize = 32;

/// Characters of a token shown in logs.
const VISIBLE_PREFIX: usize = 6;

/// An opaque bearer credential. Serializes as its hex string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Draw a fresh token from the operating system's CSPRNG.
    ///
    /// If the OS cannot provide randomness, no token is issued.
    pub fn generate() -> Result<Self> {
        Self::generate_from(&mut OsRng)
    }

    pub(crate) fn generate_from<R: RngCore>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0_u8; TOKEN_BYTES];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|_| Error::EntropyUnavailable)?;
        Ok(Self(HEXLOWER.encode(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl Display for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only a short prefix, so tokens never end up in logs whole.
impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let prefix = self.0.get(..VISIBLE_PREFIX).unwrap_or("");
        write!(f, "SessionToken({prefix}..)")
    }
}

/// The server side of a token: who it belongs to and when it was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Has this session outlived `ttl` at time `now`? Without a TTL,
    /// sessions live until revoked.
    pub fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        ttl.map_or(false, |ttl| now - self.created_at >= ttl)
    }
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use rand::{Error as RandError, RngCore};

    /// An RNG whose source has dried up.
    pub struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unimplemented!()
        }

        fn next_u64(&mut self) -> u64 {
            unimplemented!()
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unimplemented!()
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), RandError> {
            Err(RandError::new("no entropy"))
        }
    }
}
