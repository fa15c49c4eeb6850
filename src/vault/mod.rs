//! Credential Vault
//!
//! Typed secure storage for private keys, passphrases, passwords, tokens and
//! per-host key fingerprints.
//!
//! # Entry model
//! - One entry per `(category, scope)`; scope is `default` except for host
//!   fingerprints, which are scoped by `host:port`
//! - Writes are delete-then-insert, never update-in-place
//! - Entries never expire; only explicit deletes and bulk clears remove them

mod backend;
mod category;
mod error;
mod store;

pub use backend::{status, BackendError, MemoryBackend, SecretBackend};
pub use category::{account_name, ScopeKey, SecretCategory};
pub use error::VaultError;
pub use store::{CredentialVault, SecretBytes};
