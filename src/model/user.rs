use serde::{Deserialize, Serialize};

use super::UserId;

/// A registered voter, as handed out by the store. The password hash stays
/// inside the store and is never part of this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub has_voted: bool,
}

impl User {
    /// A voter who has not yet voted.
    pub fn new(id: UserId, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            has_voted: false,
        }
    }
}
