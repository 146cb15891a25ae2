//! The election's state: voters, sessions, candidates and the vote ledger.
//!
//! [`Storage`] is the one capability the rest of the server sees. It is made
//! up of three facets:
//!
//! * [`CredentialStore`]: voter records and password checks.
//! * [`SessionStore`]: bearer tokens bound to voters.
//! * [`ElectionStore`]: candidates and the append-only vote ledger.
//!
//! Any implementation must keep a voter's has-voted flag and their vote in
//! step: both appear together or neither does. [`MemoryStore`] is the only
//! implementation.

use std::sync::Arc;

mod credentials;
mod election;
mod memory;
mod sessions;

pub use credentials::CredentialStore;
pub use election::ElectionStore;
pub use memory::MemoryStore;
pub use sessions::SessionStore;

/// The full storage capability.
pub trait Storage: CredentialStore + SessionStore + ElectionStore + Send + Sync {}

impl<T> Storage for T where T: CredentialStore + SessionStore + ElectionStore + Send + Sync {}

/// Shared handle to the store, as kept in Rocket's managed state.
pub type Store = Arc<dyn Storage>;
