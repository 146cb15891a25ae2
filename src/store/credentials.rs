use log::{debug, info};

use crate::error::{Error, Result};
use crate::model::{PasswordHash, User, UserId};

use super::memory::{MemoryStore, Tables};

/// Voter records and password verification.
pub trait CredentialStore {
    /// Register a new voter. All three fields must be non-empty, and the
    /// username must not be taken (exact, case-sensitive match).
    fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User>;

    /// Check a username/password pair. Unknown usernames and wrong
    /// passwords fail identically with [`Error::InvalidCredentials`].
    fn authenticate(&self, username: &str, password: &str) -> Result<User>;

    fn get_user(&self, id: UserId) -> Result<User>;
}

/// A user record together with its password hash.
pub(super) struct Account {
    pub user: User,
    pub password_hash: PasswordHash,
}

impl Tables {
    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id).map(|account| &account.user)
    }

    fn account_by_username(&self, username: &str) -> Option<&Account> {
        self.usernames
            .get(username)
            .and_then(|id| self.users.get(id))
    }

    fn insert_user(&mut self, username: &str, email: &str, password_hash: PasswordHash) -> Result<User> {
        if self.usernames.contains_key(username) {
            return Err(Error::DuplicateUsername);
        }
        let user = User::new(self.next_user_id(), username, email);
        self.usernames.insert(user.username.clone(), user.id);
        self.users.insert(
            user.id,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    /// Flip a user's has-voted flag. Not idempotent and not atomic with
    /// anything on its own: only call this inside the write section that
    /// also records the vote.
    pub fn mark_voted(&mut self, id: UserId) -> Result<()> {
        let account = self.users.get_mut(&id).ok_or(Error::NotFound)?;
        account.user.has_voted = true;
        Ok(())
    }
}

impl CredentialStore for MemoryStore {
    fn create_user(&self, username: &str, email: &str, password: &str) -> Result<User> {
        for (field, value) in [("username", username), ("email", email), ("password", password)] {
            if value.is_empty() {
                return Err(Error::MissingField(field));
            }
        }

        // Fail fast before paying for a hash; checked again under the write lock.
        if self.read().usernames.contains_key(username) {
            return Err(Error::DuplicateUsername);
        }
        let password_hash = PasswordHash::new(password, &self.hash_cost)?;

        let user = self.write().insert_user(username, email, password_hash)?;
        info!("Registered user {} ({})", user.id, user.username);
        Ok(user)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        // Verification is slow, so run it outside the lock.
        let account = self
            .read()
            .account_by_username(username)
            .map(|account| (account.user.clone(), account.password_hash.clone()));

        match account {
            Some((user, hash)) if hash.verify(password) => Ok(user),
            Some(_) => {
                debug!("Failed login for user {username}");
                Err(Error::InvalidCredentials)
            }
            None => {
                self.dummy_hash.verify(password);
                debug!("Failed login for unknown user");
                Err(Error::InvalidCredentials)
            }
        }
    }

    fn get_user(&self, id: UserId) -> Result<User> {
        self.read().user(id).cloned().ok_or(Error::NotFound)
    }
}
