//! Secret categories and scope keys

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of secret held in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecretCategory {
    PrivateKey,
    Passphrase,
    SshPassword,
    AuthPassword,
    AuthToken,
    ApiKey,
    DeviceUserId,
    PushToken,
    HostFingerprint,
}

impl SecretCategory {
    pub const ALL: [SecretCategory; 9] = [
        SecretCategory::PrivateKey,
        SecretCategory::Passphrase,
        SecretCategory::SshPassword,
        SecretCategory::AuthPassword,
        SecretCategory::AuthToken,
        SecretCategory::ApiKey,
        SecretCategory::DeviceUserId,
        SecretCategory::PushToken,
        SecretCategory::HostFingerprint,
    ];

    /// Credentials used to open an SSH session
    pub const CONNECTION: [SecretCategory; 3] = [
        SecretCategory::PrivateKey,
        SecretCategory::Passphrase,
        SecretCategory::SshPassword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretCategory::PrivateKey => "private-key",
            SecretCategory::Passphrase => "passphrase",
            SecretCategory::SshPassword => "ssh-password",
            SecretCategory::AuthPassword => "auth-password",
            SecretCategory::AuthToken => "auth-token",
            SecretCategory::ApiKey => "api-key",
            SecretCategory::DeviceUserId => "device-user-id",
            SecretCategory::PushToken => "push-token",
            SecretCategory::HostFingerprint => "host-fingerprint",
        }
    }

    /// Optional credentials: storing an empty value clears them.
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            SecretCategory::SshPassword
                | SecretCategory::AuthPassword
                | SecretCategory::AuthToken
                | SecretCategory::PushToken
        )
    }
}

impl fmt::Display for SecretCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Second half of an entry's identity.
///
/// Every category except host fingerprints uses the per-device singleton;
/// fingerprints are scoped by endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey(String);

impl ScopeKey {
    const SINGLETON: &'static str = "default";
    /// Reserved scope for the trusted-endpoint index. Contains no `:` so it
    /// can never collide with an endpoint scope.
    const HOST_INDEX: &'static str = "known-hosts-index";

    pub fn singleton() -> Self {
        Self(Self::SINGLETON.to_string())
    }

    /// `"{host}:{port}"`, host lower-cased
    pub fn endpoint(host: &str, port: u16) -> Self {
        Self(format!("{}:{}", host.trim().to_lowercase(), port))
    }

    pub(crate) fn host_index() -> Self {
        Self(Self::HOST_INDEX.to_string())
    }

    pub(crate) fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account name for a `(category, scope)` pair, as used by the backends
pub fn account_name(category: SecretCategory, scope: &ScopeKey) -> String {
    format!("{}/{}", category.as_str(), scope.as_str())
}
