use std::fmt::{Debug, Formatter};

use argon2::{Config, Variant};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// 16 bytes is recommended for password hashing:
///  https://en.wikipedia.org/wiki/Argon2
const SALT_LENGTH: usize = 16;

/// Tunable argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub mem_cost: u32,
    /// Number of passes.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub lanes: u32,
}

impl Default for HashCost {
    /// OWASP's baseline argon2id recommendation.
    fn default() -> Self {
        Self {
            mem_cost: 19456,
            time_cost: 2,
            lanes: 1,
        }
    }
}

impl HashCost {
    fn config(&self) -> Config<'static> {
        Config {
            variant: Variant::Argon2id,
            mem_cost: self.mem_cost,
            time_cost: self.time_cost,
            lanes: self.lanes,
            ..Config::default()
        }
    }
}

/// A salted, PHC-encoded argon2 hash of a password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password with a fresh salt from the OS CSPRNG.
    pub fn new(password: &str, cost: &HashCost) -> Result<Self> {
        Self::new_from(password, cost, &mut OsRng)
    }

    pub(crate) fn new_from<R: RngCore>(password: &str, cost: &HashCost, rng: &mut R) -> Result<Self> {
        let mut salt = [0_u8; SALT_LENGTH];
        rng.try_fill_bytes(&mut salt)
            .map_err(|_| Error::EntropyUnavailable)?;
        let encoded = argon2::hash_encoded(password.as_bytes(), &salt, &cost.config())?;
        Ok(Self(encoded))
    }

    /// Check whether the given password matches. The encoded parameters are
    /// used, so hashes made under an older cost keep verifying.
    pub fn verify(&self, password: &str) -> bool {
        // A malformed hash cannot match anything.
        argon2::verify_encoded(&self.0, password.as_bytes()).unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl HashCost {
        /// Far too weak for production, but keeps tests fast.
        pub fn cheap() -> Self {
            Self {
                mem_cost: 64,
                time_cost: 1,
                lanes: 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::session::examples::BrokenRng;

    #[test]
    fn verifies_correct_password() {
        let hash = PasswordHash::new("pw123", &HashCost::cheap()).unwrap();
        assert!(hash.verify("pw123"));
        assert!(!hash.verify("pw124"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn never_stores_plaintext() {
        let hash = PasswordHash::new("pw123", &HashCost::cheap()).unwrap();
        assert!(!hash.as_str().contains("pw123"));
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert_eq!("PasswordHash(..)", format!("{hash:?}"));
    }

    #[test]
    fn salts_are_random() {
        let first = PasswordHash::new("pw123", &HashCost::cheap()).unwrap();
        let second = PasswordHash::new("pw123", &HashCost::cheap()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn cost_is_encoded_in_hash() {
        let cost = HashCost {
            mem_cost: 128,
            time_cost: 2,
            lanes: 1,
        };
        let hash = PasswordHash::new("pw123", &cost).unwrap();
        assert!(hash.as_str().contains("m=128,t=2,p=1"));
    }

    #[test]
    fn failing_rng_is_fatal() {
        let result = PasswordHash::new_from("pw123", &HashCost::cheap(), &mut BrokenRng);
        assert!(matches!(result, Err(Error::EntropyUnavailable)));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let hash = PasswordHash("not a hash".to_string());
        assert!(!hash.verify("not a hash"));
    }
}
