//! Credential vault service
//!
//! One `CredentialVault` is built at startup and cloned into whoever needs
//! it. Clones share the backend and the lock tables.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::backend::{BackendError, MemoryBackend, SecretBackend};
use super::category::{account_name, ScopeKey, SecretCategory};
use super::error::VaultError;

/// Secret bytes, wiped on drop
pub type SecretBytes = Zeroizing<Vec<u8>>;

struct VaultInner {
    backend: Arc<dyn SecretBackend>,
    /// Per-account locks serializing read-check-write sequences
    locks: DashMap<String, Arc<Mutex<()>>>,
    /// Guards the trusted-endpoint index
    index_lock: Mutex<()>,
}

/// Typed secure key/value store
#[derive(Clone)]
pub struct CredentialVault {
    inner: Arc<VaultInner>,
}

impl CredentialVault {
    pub fn new(backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            inner: Arc::new(VaultInner {
                backend,
                locks: DashMap::new(),
                index_lock: Mutex::new(()),
            }),
        }
    }

    /// Vault backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    fn lock_for(&self, account: &str) -> Arc<Mutex<()>> {
        self.inner
            .locks
            .entry(account.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Store a secret (delete-then-insert).
    ///
    /// An empty payload for an optional category clears the entry instead.
    pub fn store(
        &self,
        category: SecretCategory,
        scope: &ScopeKey,
        secret: &[u8],
    ) -> Result<(), VaultError> {
        let account = account_name(category, scope);
        let lock = self.lock_for(&account);
        let _guard = lock.lock();

        if secret.is_empty() && category.is_optional() {
            debug!("Vault store with empty {} clears entry", category);
            return self.delete_account(&account);
        }
        self.replace_account(&account, secret)
    }

    /// Retrieve a secret, `None` if it was never stored
    pub fn retrieve(
        &self,
        category: SecretCategory,
        scope: &ScopeKey,
    ) -> Result<Option<SecretBytes>, VaultError> {
        let account = account_name(category, scope);
        self.load_account(&account)
    }

    /// Delete a secret. Deleting an absent entry succeeds.
    pub fn delete(&self, category: SecretCategory, scope: &ScopeKey) -> Result<(), VaultError> {
        let account = account_name(category, scope);
        let lock = self.lock_for(&account);
        let _guard = lock.lock();
        self.delete_account(&account)
    }

    pub fn store_text(
        &self,
        category: SecretCategory,
        scope: &ScopeKey,
        secret: &str,
    ) -> Result<(), VaultError> {
        self.store(category, scope, secret.as_bytes())
    }

    pub fn retrieve_text(
        &self,
        category: SecretCategory,
        scope: &ScopeKey,
    ) -> Result<Option<Zeroizing<String>>, VaultError> {
        match self.retrieve(category, scope)? {
            Some(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    VaultError::Corrupt(format!("{} is not valid UTF-8", category))
                })?;
                Ok(Some(Zeroizing::new(text)))
            }
            None => Ok(None),
        }
    }

    /// Read an entry, or generate, store and return it if absent.
    ///
    /// Concurrent first callers for the same `(category, scope)` converge on
    /// a single value: the generator runs at most once per absent entry.
    pub fn get_or_insert_with<F>(
        &self,
        category: SecretCategory,
        scope: &ScopeKey,
        generator: F,
    ) -> Result<SecretBytes, VaultError>
    where
        F: FnOnce() -> Vec<u8>,
    {
        let account = account_name(category, scope);
        let lock = self.lock_for(&account);
        let _guard = lock.lock();

        if let Some(existing) = self.load_account(&account)? {
            return Ok(existing);
        }

        let value = Zeroizing::new(generator());
        self.replace_account(&account, &value)?;
        info!("Vault generated new {}", category);
        Ok(value)
    }

    /// Stable per-device identifier, created on first call
    pub fn get_or_create_device_user_id(&self) -> Result<String, VaultError> {
        let bytes = self.get_or_insert_with(
            SecretCategory::DeviceUserId,
            &ScopeKey::singleton(),
            || Uuid::new_v4().to_string().into_bytes(),
        )?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| VaultError::Corrupt("device user id is not valid UTF-8".to_string()))
    }

    /// Remove private key, passphrase and SSH password
    pub fn clear_connection_credentials(&self) -> Result<(), VaultError> {
        info!("Clearing connection credentials");
        let scope = ScopeKey::singleton();
        let mut first_error = None;
        for category in SecretCategory::CONNECTION {
            if let Err(e) = self.delete(category, &scope) {
                warn!("Failed to clear {}: {}", category, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Remove every secret, including tokens and host fingerprints.
    ///
    /// Keeps going after a failure and reports the first one.
    pub fn clear_all_credentials(&self) -> Result<(), VaultError> {
        info!("Clearing all credentials");
        let scope = ScopeKey::singleton();
        let mut first_error = None;

        for category in SecretCategory::ALL {
            if category == SecretCategory::HostFingerprint {
                continue;
            }
            if let Err(e) = self.delete(category, &scope) {
                warn!("Failed to clear {}: {}", category, e);
                first_error.get_or_insert(e);
            }
        }

        let _index_guard = self.inner.index_lock.lock();
        match self.load_index() {
            Ok(endpoints) => {
                let mut remaining = BTreeSet::new();
                for endpoint in endpoints {
                    let scope = ScopeKey::from_raw(endpoint.clone());
                    if let Err(e) = self.delete(SecretCategory::HostFingerprint, &scope) {
                        warn!("Failed to clear fingerprint for {}: {}", endpoint, e);
                        first_error.get_or_insert(e);
                        remaining.insert(endpoint);
                    }
                }
                // Endpoints that failed to clear stay indexed for a retry
                if let Err(e) = self.save_index(&remaining) {
                    first_error.get_or_insert(e);
                }
            }
            Err(e @ VaultError::Corrupt(_)) => {
                warn!("Trusted host index corrupt, removing it: {}", e);
                if let Err(delete_err) =
                    self.delete(SecretCategory::HostFingerprint, &ScopeKey::host_index())
                {
                    first_error.get_or_insert(delete_err);
                }
                first_error.get_or_insert(e);
            }
            Err(e) => {
                warn!("Trusted host index unreadable, keeping it: {}", e);
                first_error.get_or_insert(e);
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Host fingerprints
    // ═══════════════════════════════════════════════════════════════════

    /// Trust a fingerprint for `host:port`.
    ///
    /// The endpoint is indexed before the fingerprint is written, so a
    /// stored fingerprint is always reachable by `clear_all_credentials`.
    /// An index that cannot be read is never overwritten; a corrupt one is
    /// rebuilt and the corruption is still reported.
    pub fn store_host_fingerprint(
        &self,
        host: &str,
        port: u16,
        fingerprint: &str,
    ) -> Result<(), VaultError> {
        let scope = ScopeKey::endpoint(host, port);

        let _index_guard = self.inner.index_lock.lock();
        let (mut endpoints, corrupt) = match self.load_index() {
            Ok(endpoints) => (endpoints, None),
            Err(e @ VaultError::Corrupt(_)) => {
                warn!("Trusted host index corrupt, rebuilding: {}", e);
                (BTreeSet::new(), Some(e))
            }
            Err(e) => return Err(e),
        };
        if endpoints.insert(scope.as_str().to_string()) || corrupt.is_some() {
            self.save_index(&endpoints)?;
        }
        self.store(SecretCategory::HostFingerprint, &scope, fingerprint.as_bytes())?;
        info!("Stored host fingerprint for {}", scope);

        corrupt.map_or(Ok(()), Err)
    }

    pub fn retrieve_host_fingerprint(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<String>, VaultError> {
        let scope = ScopeKey::endpoint(host, port);
        Ok(self
            .retrieve_text(SecretCategory::HostFingerprint, &scope)?
            .map(|fp| fp.as_str().to_string()))
    }

    /// Forget a host. The next connection goes through first use again.
    ///
    /// An unreadable index is left as it is and the read error returned.
    pub fn delete_host_fingerprint(&self, host: &str, port: u16) -> Result<(), VaultError> {
        let scope = ScopeKey::endpoint(host, port);

        let _index_guard = self.inner.index_lock.lock();
        self.delete(SecretCategory::HostFingerprint, &scope)?;
        info!("Removed host fingerprint for {}", scope);

        let mut endpoints = self.load_index()?;
        if endpoints.remove(scope.as_str()) {
            self.save_index(&endpoints)?;
        }
        Ok(())
    }

    /// Endpoints (`host:port`) with a stored fingerprint
    pub fn trusted_hosts(&self) -> Result<Vec<String>, VaultError> {
        let _index_guard = self.inner.index_lock.lock();
        Ok(self.load_index()?.into_iter().collect())
    }

    fn load_index(&self) -> Result<BTreeSet<String>, VaultError> {
        let account = account_name(SecretCategory::HostFingerprint, &ScopeKey::host_index());
        match self.load_account(&account)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| VaultError::Corrupt(format!("trusted host index: {}", e))),
            None => Ok(BTreeSet::new()),
        }
    }

    fn save_index(&self, endpoints: &BTreeSet<String>) -> Result<(), VaultError> {
        let scope = ScopeKey::host_index();
        if endpoints.is_empty() {
            return self.delete(SecretCategory::HostFingerprint, &scope);
        }
        let json = serde_json::to_vec(endpoints)
            .map_err(|e| VaultError::Corrupt(format!("trusted host index: {}", e)))?;
        self.store(SecretCategory::HostFingerprint, &scope, &json)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Async access
    // ═══════════════════════════════════════════════════════════════════

    /// Run vault work on the blocking pool.
    ///
    /// The platform store does synchronous I/O; async callers must come
    /// through here rather than calling the vault inline.
    pub async fn blocking<T, F>(&self, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&CredentialVault) -> Result<T, VaultError> + Send + 'static,
        T: Send + 'static,
    {
        let vault = self.clone();
        tokio::task::spawn_blocking(move || f(&vault))
            .await
            .map_err(|e| VaultError::TaskFailed(e.to_string()))?
    }

    // ═══════════════════════════════════════════════════════════════════
    // Backend plumbing
    // ═══════════════════════════════════════════════════════════════════

    fn load_account(&self, account: &str) -> Result<Option<SecretBytes>, VaultError> {
        match self.inner.backend.load(account) {
            Ok(found) => Ok(found.map(Zeroizing::new)),
            Err(BackendError::NotFound) => Ok(None),
            Err(e) => {
                warn!("Vault read failed: account={}, error={}", account, e);
                Err(VaultError::ReadFailed {
                    account: account.to_string(),
                    status: e.status(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Caller holds the account lock
    fn replace_account(&self, account: &str, secret: &[u8]) -> Result<(), VaultError> {
        self.delete_account(account)?;
        self.inner.backend.insert(account, secret).map_err(|e| {
            warn!("Vault write failed: account={}, error={}", account, e);
            VaultError::WriteFailed {
                account: account.to_string(),
                status: e.status(),
                message: e.to_string(),
            }
        })?;
        debug!("Vault stored {} ({} bytes)", account, secret.len());
        Ok(())
    }

    /// Caller holds the account lock
    fn delete_account(&self, account: &str) -> Result<(), VaultError> {
        match self.inner.backend.remove(account) {
            Ok(()) | Err(BackendError::NotFound) => Ok(()),
            Err(e) => {
                warn!("Vault delete failed: account={}, error={}", account, e);
                Err(VaultError::DeleteFailed {
                    account: account.to_string(),
                    status: e.status(),
                    message: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn memory_vault() -> (CredentialVault, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (CredentialVault::new(backend.clone()), backend)
    }

    /// Backend whose operations can be made to fail on demand
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_insert: AtomicBool,
        fail_remove: AtomicBool,
        fail_load: AtomicBool,
        /// Upcoming reads of the trusted host index that fail
        fail_index_loads: AtomicUsize,
    }

    impl SecretBackend for FlakyBackend {
        fn load(&self, account: &str) -> Result<Option<Vec<u8>>, BackendError> {
            if self.fail_load.load(Ordering::SeqCst) {
                return Err(BackendError::platform(-25308, "interaction not allowed"));
            }
            if account.ends_with(ScopeKey::host_index().as_str())
                && self
                    .fail_index_loads
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(BackendError::platform(-25308, "interaction not allowed"));
            }
            self.inner.load(account)
        }

        fn insert(&self, account: &str, secret: &[u8]) -> Result<(), BackendError> {
            if self.fail_insert.load(Ordering::SeqCst) {
                return Err(BackendError::platform(-34018, "missing entitlement"));
            }
            self.inner.insert(account, secret)
        }

        fn remove(&self, account: &str) -> Result<(), BackendError> {
            if self.fail_remove.load(Ordering::SeqCst) {
                return Err(BackendError::platform(-25293, "auth failed"));
            }
            self.inner.remove(account)
        }
    }

    #[test]
    fn test_store_retrieve_delete_every_category() {
        let (vault, _) = memory_vault();
        for category in SecretCategory::ALL {
            let scope = if category == SecretCategory::HostFingerprint {
                ScopeKey::endpoint("example.com", 22)
            } else {
                ScopeKey::singleton()
            };
            let secret = format!("secret for {}", category);

            vault.store(category, &scope, secret.as_bytes()).unwrap();
            let read = vault.retrieve(category, &scope).unwrap().unwrap();
            assert_eq!(read.as_slice(), secret.as_bytes());

            vault.delete(category, &scope).unwrap();
            assert!(vault.retrieve(category, &scope).unwrap().is_none());
        }
    }

    #[test]
    fn test_restore_replaces_value() {
        let (vault, backend) = memory_vault();
        let scope = ScopeKey::singleton();
        vault.store(SecretCategory::ApiKey, &scope, b"one").unwrap();
        vault.store(SecretCategory::ApiKey, &scope, b"two").unwrap();

        let read = vault.retrieve(SecretCategory::ApiKey, &scope).unwrap().unwrap();
        assert_eq!(read.as_slice(), b"two");
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let (vault, _) = memory_vault();
        assert!(vault
            .delete(SecretCategory::AuthToken, &ScopeKey::singleton())
            .is_ok());
        assert!(vault.delete_host_fingerprint("nowhere.test", 22).is_ok());
    }

    #[test]
    fn test_empty_optional_store_clears() {
        let (vault, _) = memory_vault();
        let scope = ScopeKey::singleton();
        vault.store(SecretCategory::SshPassword, &scope, b"pw").unwrap();
        vault.store(SecretCategory::SshPassword, &scope, b"").unwrap();
        assert!(vault
            .retrieve(SecretCategory::SshPassword, &scope)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_empty_required_store_keeps_empty_value() {
        let (vault, _) = memory_vault();
        let scope = ScopeKey::singleton();
        vault.store(SecretCategory::ApiKey, &scope, b"").unwrap();
        let read = vault.retrieve(SecretCategory::ApiKey, &scope).unwrap();
        assert_eq!(read.map(|v| v.len()), Some(0));
    }

    #[test]
    fn test_failures_are_classified() {
        let backend = Arc::new(FlakyBackend::default());
        let vault = CredentialVault::new(backend.clone());
        let scope = ScopeKey::singleton();

        backend.fail_insert.store(true, Ordering::SeqCst);
        let err = vault
            .store(SecretCategory::PrivateKey, &scope, b"key")
            .unwrap_err();
        assert!(matches!(err, VaultError::WriteFailed { status: -34018, .. }));
        // Failed write after the delete phase reads back as never stored
        assert!(vault
            .retrieve(SecretCategory::PrivateKey, &scope)
            .unwrap()
            .is_none());
        backend.fail_insert.store(false, Ordering::SeqCst);

        vault.store(SecretCategory::PrivateKey, &scope, b"key").unwrap();
        backend.fail_remove.store(true, Ordering::SeqCst);
        let err = vault.delete(SecretCategory::PrivateKey, &scope).unwrap_err();
        assert_eq!(err.status(), Some(-25293));
        assert!(matches!(err, VaultError::DeleteFailed { .. }));
        backend.fail_remove.store(false, Ordering::SeqCst);

        backend.fail_load.store(true, Ordering::SeqCst);
        let err = vault
            .retrieve(SecretCategory::PrivateKey, &scope)
            .unwrap_err();
        assert!(matches!(err, VaultError::ReadFailed { status: -25308, .. }));
    }

    #[test]
    fn test_clear_connection_credentials_keeps_tokens() {
        let (vault, _) = memory_vault();
        let scope = ScopeKey::singleton();
        vault.store_text(SecretCategory::PrivateKey, &scope, "k").unwrap();
        vault.store_text(SecretCategory::Passphrase, &scope, "p").unwrap();
        vault.store_text(SecretCategory::SshPassword, &scope, "s").unwrap();
        vault.store_text(SecretCategory::AuthToken, &scope, "t").unwrap();

        vault.clear_connection_credentials().unwrap();

        for category in SecretCategory::CONNECTION {
            assert!(vault.retrieve(category, &scope).unwrap().is_none());
        }
        let token = vault
            .retrieve_text(SecretCategory::AuthToken, &scope)
            .unwrap()
            .unwrap();
        assert_eq!(token.as_str(), "t");
    }

    #[test]
    fn test_clear_all_credentials_removes_fingerprints() {
        let (vault, backend) = memory_vault();
        let scope = ScopeKey::singleton();
        vault.store_text(SecretCategory::AuthToken, &scope, "t").unwrap();
        vault.store_text(SecretCategory::PushToken, &scope, "p").unwrap();
        vault.get_or_create_device_user_id().unwrap();
        vault.store_host_fingerprint("a.example", 22, "aa:bb").unwrap();
        vault.store_host_fingerprint("b.example", 2222, "cc:dd").unwrap();

        vault.clear_all_credentials().unwrap();

        assert!(backend.is_empty());
        assert!(vault.trusted_hosts().unwrap().is_empty());
        assert!(vault
            .retrieve_host_fingerprint("a.example", 22)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unreadable_index_is_never_overwritten() {
        let backend = Arc::new(FlakyBackend::default());
        let vault = CredentialVault::new(backend.clone());
        vault.store_host_fingerprint("a.example", 22, "aa").unwrap();

        backend.fail_index_loads.store(1, Ordering::SeqCst);
        let err = vault
            .store_host_fingerprint("b.example", 22, "bb")
            .unwrap_err();
        assert!(matches!(err, VaultError::ReadFailed { status: -25308, .. }));
        assert_eq!(vault.retrieve_host_fingerprint("b.example", 22).unwrap(), None);
        assert_eq!(vault.trusted_hosts().unwrap(), vec!["a.example:22".to_string()]);

        vault.store_host_fingerprint("b.example", 22, "bb").unwrap();
        vault.clear_all_credentials().unwrap();
        assert_eq!(vault.retrieve_host_fingerprint("a.example", 22).unwrap(), None);
        assert_eq!(vault.retrieve_host_fingerprint("b.example", 22).unwrap(), None);
        assert!(backend.inner.is_empty());
    }

    #[test]
    fn test_clear_all_reports_unreadable_index_and_keeps_it() {
        let backend = Arc::new(FlakyBackend::default());
        let vault = CredentialVault::new(backend.clone());
        vault.store_host_fingerprint("a.example", 22, "aa").unwrap();

        backend.fail_index_loads.store(1, Ordering::SeqCst);
        let err = vault.clear_all_credentials().unwrap_err();
        assert!(matches!(err, VaultError::ReadFailed { .. }));
        assert_eq!(vault.trusted_hosts().unwrap(), vec!["a.example:22".to_string()]);

        // A retry clears what the failed attempt could not reach
        vault.clear_all_credentials().unwrap();
        assert_eq!(vault.retrieve_host_fingerprint("a.example", 22).unwrap(), None);
        assert!(backend.inner.is_empty());
    }

    #[test]
    fn test_delete_fingerprint_reports_unreadable_index() {
        let backend = Arc::new(FlakyBackend::default());
        let vault = CredentialVault::new(backend.clone());
        vault.store_host_fingerprint("a.example", 22, "aa").unwrap();
        vault.store_host_fingerprint("b.example", 22, "bb").unwrap();

        backend.fail_index_loads.store(1, Ordering::SeqCst);
        assert!(vault.delete_host_fingerprint("a.example", 22).is_err());
        assert_eq!(vault.retrieve_host_fingerprint("a.example", 22).unwrap(), None);
        assert_eq!(
            vault.trusted_hosts().unwrap(),
            vec!["a.example:22".to_string(), "b.example:22".to_string()]
        );
    }

    #[test]
    fn test_corrupt_index_is_rebuilt_and_reported() {
        let (vault, _) = memory_vault();
        vault
            .store(SecretCategory::HostFingerprint, &ScopeKey::host_index(), b"not json")
            .unwrap();

        let err = vault.store_host_fingerprint("a.example", 22, "aa").unwrap_err();
        assert!(matches!(err, VaultError::Corrupt(_)));
        assert_eq!(vault.trusted_hosts().unwrap(), vec!["a.example:22".to_string()]);
        assert_eq!(
            vault.retrieve_host_fingerprint("a.example", 22).unwrap(),
            Some("aa".to_string())
        );
    }

    #[test]
    fn test_host_fingerprint_index() {
        let (vault, _) = memory_vault();
        vault.store_host_fingerprint("Example.com", 22, "aa").unwrap();
        vault.store_host_fingerprint("example.com", 2222, "bb").unwrap();
        vault.store_host_fingerprint("example.com", 22, "cc").unwrap();

        assert_eq!(
            vault.trusted_hosts().unwrap(),
            vec!["example.com:22".to_string(), "example.com:2222".to_string()]
        );
        assert_eq!(
            vault.retrieve_host_fingerprint("EXAMPLE.com", 22).unwrap(),
            Some("cc".to_string())
        );

        vault.delete_host_fingerprint("example.com", 22).unwrap();
        assert_eq!(
            vault.trusted_hosts().unwrap(),
            vec!["example.com:2222".to_string()]
        );
    }

    #[test]
    fn test_get_or_insert_runs_generator_once() {
        let (vault, _) = memory_vault();
        let scope = ScopeKey::singleton();
        let calls = AtomicUsize::new(0);

        let first = vault
            .get_or_insert_with(SecretCategory::ApiKey, &scope, || {
                calls.fetch_add(1, Ordering::SeqCst);
                b"generated".to_vec()
            })
            .unwrap();
        let second = vault
            .get_or_insert_with(SecretCategory::ApiKey, &scope, || {
                calls.fetch_add(1, Ordering::SeqCst);
                b"other".to_vec()
            })
            .unwrap();

        assert_eq!(first.as_slice(), b"generated");
        assert_eq!(second.as_slice(), b"generated");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_device_user_id_concurrent_first_callers_converge() {
        let (vault, backend) = memory_vault();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let vault = vault.clone();
                std::thread::spawn(move || vault.get_or_create_device_user_id().unwrap())
            })
            .collect();
        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(ids.len(), 1);
        assert_eq!(backend.write_count(), 1);
        let id = ids.into_iter().next().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(vault.get_or_create_device_user_id().unwrap(), id);
    }

    #[tokio::test]
    async fn test_blocking_runs_off_runtime() {
        let (vault, _) = memory_vault();
        vault
            .blocking(|v| v.store_text(SecretCategory::AuthToken, &ScopeKey::singleton(), "tok"))
            .await
            .unwrap();
        let token = vault
            .blocking(|v| v.retrieve_text(SecretCategory::AuthToken, &ScopeKey::singleton()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(token.as_str(), "tok");
    }
}
