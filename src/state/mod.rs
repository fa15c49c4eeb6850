//! Identity state
//!
//! Composition root for the identity layer. Built once at startup and handed
//! to callers; owns the vault handle, the key detector and the host
//! validator.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use zeroize::Zeroizing;

use crate::config::{ConfigStorage, IdentityConfig, KeychainBackend, StorageError};
use crate::keys::{KeyDetector, KeyError, KeyMaterial};
use crate::ssh::{HostTrustValidator, SshConfig};
use crate::vault::{CredentialVault, ScopeKey, SecretCategory, VaultError};

/// Startup and key import failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<StorageError> for IdentityError {
    fn from(err: StorageError) -> Self {
        IdentityError::Config(err.to_string())
    }
}

pub struct IdentityState {
    config: IdentityConfig,
    vault: CredentialVault,
    detector: KeyDetector,
    validator: Arc<HostTrustValidator>,
}

impl IdentityState {
    /// Read `identity.json` from `storage` and build state over the system
    /// keychain
    pub async fn load(storage: &ConfigStorage) -> Result<Self, IdentityError> {
        let config = storage.load().await?;
        info!(
            "Loaded identity config from {:?} (keychain service: {})",
            storage.path(),
            config.keychain_service
        );
        Ok(Self::from_config(config))
    }

    /// State over the system keychain
    pub fn from_config(config: IdentityConfig) -> Self {
        let backend = Arc::new(KeychainBackend::with_service(config.keychain_service.clone()));
        let detector = KeyDetector::from_config(&config);
        Self::with_vault(config, CredentialVault::new(backend), detector)
    }

    /// State over an in-process vault (tests, headless tools)
    pub fn in_memory() -> Self {
        Self::with_vault(
            IdentityConfig::default(),
            CredentialVault::in_memory(),
            KeyDetector::default(),
        )
    }

    pub fn with_vault(
        config: IdentityConfig,
        vault: CredentialVault,
        detector: KeyDetector,
    ) -> Self {
        let validator = Arc::new(HostTrustValidator::new(vault.clone()));
        Self {
            config,
            vault,
            detector,
            validator,
        }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Connection target using the configured connect timeout
    pub fn ssh_config(
        &self,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
    ) -> SshConfig {
        SshConfig::from_identity_config(host, port, username, &self.config)
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    pub fn detector(&self) -> &KeyDetector {
        &self.detector
    }

    pub fn validator(&self) -> Arc<HostTrustValidator> {
        self.validator.clone()
    }

    /// Normalize a pasted private key and store it with its passphrase.
    ///
    /// Nothing is written when the key is rejected. An empty passphrase
    /// removes a previously stored one.
    pub async fn import_private_key(
        &self,
        raw: &str,
        passphrase: &str,
    ) -> Result<KeyMaterial, IdentityError> {
        let material = self.detector.analyze(raw)?;

        let text = material.normalized_text.clone();
        let passphrase = Zeroizing::new(passphrase.to_string());
        self.vault
            .blocking(move |vault| {
                let scope = ScopeKey::singleton();
                vault.store_text(SecretCategory::PrivateKey, &scope, &text)?;
                if passphrase.is_empty() {
                    vault.delete(SecretCategory::Passphrase, &scope)
                } else {
                    vault.store_text(SecretCategory::Passphrase, &scope, &passphrase)
                }
            })
            .await?;

        info!(
            "Imported {} private key (format: {:?}, encrypted: {}, recovered: {})",
            material.algorithm, material.format, material.encrypted, material.recovered
        );
        Ok(material)
    }
}
