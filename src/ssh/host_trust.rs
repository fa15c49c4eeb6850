//! Trust-on-first-use host key validation
//!
//! Each `host:port` endpoint is either Unknown (no stored fingerprint) or
//! Trusted. The first key seen for an Unknown endpoint is stored in the
//! vault; every later key must match it exactly. A mismatch is reported and
//! the stored fingerprint is left alone. Only an explicit user action
//! (`CredentialVault::delete_host_fingerprint` or [`HostTrustValidator::retrust`])
//! changes a trusted record.

use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;
use russh::keys::{PublicKey, PublicKeyBase64};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::vault::{CredentialVault, ScopeKey, VaultError};

/// Server public key as presented during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKey {
    algorithm: String,
    /// SSH wire encoding of the public key
    key_data: Vec<u8>,
}

impl HostKey {
    pub fn new(algorithm: impl Into<String>, key_data: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm: algorithm.into(),
            key_data: key_data.into(),
        }
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn key_data(&self) -> &[u8] {
        &self.key_data
    }

    /// SHA-256 over the algorithm name (as an SSH string) followed by the
    /// wire-encoded key, as colon-separated lowercase hex pairs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.algorithm.len() as u32).to_be_bytes());
        hasher.update(self.algorithm.as_bytes());
        hasher.update(&self.key_data);
        let digest = hasher.finalize();

        let mut out = String::with_capacity(digest.len() * 3);
        for (i, byte) in digest.iter().enumerate() {
            if i > 0 {
                out.push(':');
            }
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }
}

impl From<&PublicKey> for HostKey {
    fn from(key: &PublicKey) -> Self {
        Self {
            algorithm: key.algorithm().as_str().to_string(),
            key_data: key.public_key_bytes(),
        }
    }
}

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrustDecision {
    /// Endpoint was unknown; the key is now trusted
    FirstUse { fingerprint: String },
    /// Key matches the stored fingerprint
    Verified { fingerprint: String },
}

impl TrustDecision {
    pub fn fingerprint(&self) -> &str {
        match self {
            TrustDecision::FirstUse { fingerprint } | TrustDecision::Verified { fingerprint } => {
                fingerprint
            }
        }
    }
}

/// Stored trust for an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrustState {
    Unknown,
    Trusted { fingerprint: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostTrustError {
    #[error(
        "HOST KEY VERIFICATION FAILED for {endpoint}: expected {expected}, received {received}. \
         The server key has changed, which could indicate a man-in-the-middle attack"
    )]
    HostKeyMismatch {
        endpoint: String,
        expected: String,
        received: String,
    },

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Host key validation cancelled")]
    Cancelled,
}

/// TOFU validator over the credential vault.
///
/// Validations for the same endpoint are serialized, so concurrent first
/// connections agree on a single stored fingerprint.
pub struct HostTrustValidator {
    vault: CredentialVault,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl HostTrustValidator {
    pub fn new(vault: CredentialVault) -> Self {
        Self {
            vault,
            locks: DashMap::new(),
        }
    }

    pub fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Validate a server key for `host:port`.
    ///
    /// Unknown endpoints are trusted and stored. Cancelling `cancel`, or
    /// dropping the returned future, prevents the first-use store.
    pub async fn validate(
        &self,
        host: &str,
        port: u16,
        key: &HostKey,
        cancel: &CancellationToken,
    ) -> Result<TrustDecision, HostTrustError> {
        let endpoint = ScopeKey::endpoint(host, port);
        let received = key.fingerprint();

        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(HostTrustError::Cancelled),
            guard = self.endpoint_lock(&endpoint).lock_owned() => guard,
        };

        let task_token = cancel.child_token();
        let abort_on_drop = task_token.clone().drop_guard();

        let host = host.to_string();
        let result = self
            .vault
            .blocking(move |vault| Ok(decide(vault, guard, &host, port, received, &task_token)))
            .await;
        abort_on_drop.disarm();

        let decision = result??;
        match &decision {
            TrustDecision::FirstUse { fingerprint } => {
                info!("TOFU: trusted new host key for {} ({})", endpoint, fingerprint);
            }
            TrustDecision::Verified { .. } => {
                debug!("Host key verified for {}", endpoint);
            }
        }
        Ok(decision)
    }

    /// Replace the stored fingerprint after the user confirmed a changed key
    pub async fn retrust(
        &self,
        host: &str,
        port: u16,
        key: &HostKey,
    ) -> Result<String, HostTrustError> {
        let endpoint = ScopeKey::endpoint(host, port);
        let fingerprint = key.fingerprint();
        let guard = self.endpoint_lock(&endpoint).lock_owned().await;

        let host = host.to_string();
        let stored = fingerprint.clone();
        self.vault
            .blocking(move |vault| {
                let _guard = guard;
                vault.store_host_fingerprint(&host, port, &stored)
            })
            .await?;

        warn!("Host key for {} re-trusted by user ({})", endpoint, fingerprint);
        Ok(fingerprint)
    }

    pub async fn state(&self, host: &str, port: u16) -> Result<TrustState, HostTrustError> {
        let host = host.to_string();
        let stored = self
            .vault
            .blocking(move |vault| vault.retrieve_host_fingerprint(&host, port))
            .await?;
        Ok(match stored {
            Some(fingerprint) => TrustState::Trusted { fingerprint },
            None => TrustState::Unknown,
        })
    }

    fn endpoint_lock(&self, endpoint: &ScopeKey) -> Arc<Mutex<()>> {
        self.locks
            .entry(endpoint.as_str().to_string())
            .or_default()
            .clone()
    }
}

/// Runs on the blocking pool with the endpoint lock held
fn decide(
    vault: &CredentialVault,
    _guard: OwnedMutexGuard<()>,
    host: &str,
    port: u16,
    received: String,
    cancel: &CancellationToken,
) -> Result<TrustDecision, HostTrustError> {
    match vault.retrieve_host_fingerprint(host, port)? {
        Some(expected) => {
            if bool::from(expected.as_bytes().ct_eq(received.as_bytes())) {
                Ok(TrustDecision::Verified {
                    fingerprint: received,
                })
            } else {
                let endpoint = ScopeKey::endpoint(host, port).to_string();
                warn!(
                    "HOST KEY CHANGED for {}! Expected {}, got {}",
                    endpoint, expected, received
                );
                Err(HostTrustError::HostKeyMismatch {
                    endpoint,
                    expected,
                    received,
                })
            }
        }
        None => {
            if cancel.is_cancelled() {
                return Err(HostTrustError::Cancelled);
            }
            vault.store_host_fingerprint(host, port, &received)?;
            Ok(TrustDecision::FirstUse {
                fingerprint: received,
            })
        }
    }
}
