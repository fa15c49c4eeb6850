//! Keychain Integration
//!
//! System keychain backend for the credential vault.
//! Uses the `keyring` crate for cross-platform keychain access.
//!
//! Entries live in the platform's local store (macOS login keychain,
//! Windows Credential Manager, Secret Service on Linux) and are not synced.

use keyring::Entry;

use crate::vault::{status, BackendError, SecretBackend};

/// Default service name for keychain entries
pub const SERVICE_NAME: &str = "com.oxideterm.identity";

/// Vault backend over the system keychain
pub struct KeychainBackend {
    service: String,
}

impl KeychainBackend {
    /// Create a backend using the default service name
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Create with custom service name (for testing)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, account: &str) -> Result<Entry, BackendError> {
        // Use explicit username to ensure stable keychain identity on macOS
        let username = whoami::username();
        Entry::new(&self.service, &format!("{}@{}", username, account)).map_err(map_keyring_error)
    }
}

impl Default for KeychainBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretBackend for KeychainBackend {
    fn load(&self, account: &str) -> Result<Option<Vec<u8>>, BackendError> {
        tracing::debug!("Keychain get: service={}, account={}", self.service, account);
        match self.entry(account)?.get_secret() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                tracing::error!("Keychain get failed: account={}, error={:?}", account, e);
                Err(map_keyring_error(e))
            }
        }
    }

    fn insert(&self, account: &str, secret: &[u8]) -> Result<(), BackendError> {
        tracing::debug!("Keychain store: service={}, account={}", self.service, account);
        let entry = self.entry(account)?;
        entry.set_secret(secret).map_err(|e| {
            tracing::error!("Keychain store failed: account={}, error={:?}", account, e);
            map_keyring_error(e)
        })?;

        // Verify the store actually worked by reading it back
        match entry.get_secret() {
            Ok(read_back) if read_back == secret => Ok(()),
            Ok(_) => {
                tracing::error!("Keychain store verification failed: content mismatch");
                Err(BackendError::platform(
                    status::VERIFY_MISMATCH,
                    "read-back did not match written secret",
                ))
            }
            Err(e) => {
                tracing::error!("Keychain store verification failed: {:?}", e);
                Err(map_keyring_error(e))
            }
        }
    }

    fn remove(&self, account: &str) -> Result<(), BackendError> {
        match self.entry(account)?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Err(BackendError::NotFound),
            Err(e) => Err(map_keyring_error(e)),
        }
    }
}

/// Classify a keyring error into a backend status code
fn map_keyring_error(err: keyring::Error) -> BackendError {
    let code = match &err {
        keyring::Error::NoEntry => return BackendError::NotFound,
        keyring::Error::PlatformFailure(_) => status::PLATFORM_FAILURE,
        keyring::Error::NoStorageAccess(_) => status::NO_STORAGE_ACCESS,
        keyring::Error::BadEncoding(_) => status::BAD_ENCODING,
        keyring::Error::TooLong(_, _) => status::TOO_LONG,
        keyring::Error::Invalid(_, _) => status::INVALID,
        keyring::Error::Ambiguous(_) => status::AMBIGUOUS,
        _ => status::UNKNOWN,
    };
    BackendError::platform(code, err.to_string())
}
