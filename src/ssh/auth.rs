//! SSH authentication material from the vault
//!
//! The stored private key is the normalized text produced at import time;
//! decoding it here is the first point where the passphrase is applied.

use russh::keys::PrivateKey;
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::error::SshError;
use crate::vault::{CredentialVault, ScopeKey, SecretCategory};

/// Credential used to authenticate a session
pub enum Identity {
    PublicKey(PrivateKey),
    Password(Zeroizing<String>),
}

/// Load the stored identity: private key first, then ssh-password.
///
/// Blocking; async callers use [`load_identity_async`].
pub fn load_identity(vault: &CredentialVault) -> Result<Identity, SshError> {
    let scope = ScopeKey::singleton();

    if let Some(key_text) = vault.retrieve_text(SecretCategory::PrivateKey, &scope)? {
        let passphrase = vault.retrieve_text(SecretCategory::Passphrase, &scope)?;
        debug!(
            "Decoding stored private key (passphrase: {})",
            passphrase.is_some()
        );

        let key = russh::keys::decode_secret_key(&key_text, passphrase.as_deref().map(String::as_str))
            .map_err(|e| {
                let message = e.to_string();
                if passphrase.is_none() && is_encrypted(&key_text) {
                    SshError::KeyError("Encrypted key requires passphrase".to_string())
                } else if message.contains("decrypt") || message.contains("password") {
                    SshError::KeyError("Invalid passphrase".to_string())
                } else {
                    SshError::KeyError(message)
                }
            })?;
        info!("Loaded stored {} key", key.algorithm().as_str());
        return Ok(Identity::PublicKey(key));
    }

    if let Some(password) = vault.retrieve_text(SecretCategory::SshPassword, &scope)? {
        return Ok(Identity::Password(password));
    }

    Err(SshError::MissingCredentials)
}

/// [`load_identity`] on the blocking pool
pub async fn load_identity_async(vault: &CredentialVault) -> Result<Identity, SshError> {
    vault.blocking(|vault| Ok(load_identity(vault))).await?
}

fn is_encrypted(key_text: &str) -> bool {
    crate::keys::analyze(key_text).is_ok_and(|material| material.encrypted)
}
