//! Secret storage backends
//!
//! The vault talks to the platform store through [`SecretBackend`]. The
//! production implementation is the system keychain
//! ([`crate::config::KeychainBackend`]); [`MemoryBackend`] keeps everything
//! in process and is what tests and headless tools use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// Error reported by a backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("No entry")]
    NotFound,

    #[error("Platform error {status}: {message}")]
    Platform { status: i32, message: String },
}

impl BackendError {
    pub fn platform(status: i32, message: impl Into<String>) -> Self {
        BackendError::Platform {
            status,
            message: message.into(),
        }
    }

    /// Status code used when an error is re-classified by the vault
    pub fn status(&self) -> i32 {
        match self {
            BackendError::NotFound => status::NOT_FOUND,
            BackendError::Platform { status, .. } => *status,
        }
    }
}

/// Stable status codes for backends that do not expose a numeric OS status
pub mod status {
    pub const NOT_FOUND: i32 = -25300;
    pub const PLATFORM_FAILURE: i32 = -1;
    pub const NO_STORAGE_ACCESS: i32 = -2;
    pub const BAD_ENCODING: i32 = -3;
    pub const TOO_LONG: i32 = -4;
    pub const INVALID: i32 = -5;
    pub const AMBIGUOUS: i32 = -6;
    pub const VERIFY_MISMATCH: i32 = -7;
    pub const UNKNOWN: i32 = -99;
}

/// Low-level secure store.
///
/// Accounts are opaque strings built by the vault. Implementations must be
/// thread-safe; each call is expected to block briefly.
pub trait SecretBackend: Send + Sync {
    /// Read an entry. `Ok(None)` when absent.
    fn load(&self, account: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Insert an entry. The vault always removes the account first.
    fn insert(&self, account: &str, secret: &[u8]) -> Result<(), BackendError>;

    /// Remove an entry. `Err(BackendError::NotFound)` when absent.
    fn remove(&self, account: &str) -> Result<(), BackendError>;
}

/// In-process backend
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful inserts since creation
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SecretBackend for MemoryBackend {
    fn load(&self, account: &str) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.entries.read().get(account).cloned())
    }

    fn insert(&self, account: &str, secret: &[u8]) -> Result<(), BackendError> {
        let mut entries = self.entries.write();
        if entries.contains_key(account) {
            // Mirrors errSecDuplicateItem: callers must delete first
            return Err(BackendError::platform(-25299, "duplicate item"));
        }
        entries.insert(account.to_string(), secret.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, account: &str) -> Result<(), BackendError> {
        match self.entries.write().remove(account) {
            Some(mut old) => {
                zeroize::Zeroize::zeroize(&mut old);
                Ok(())
            }
            None => Err(BackendError::NotFound),
        }
    }
}
