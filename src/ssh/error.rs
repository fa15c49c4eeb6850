//! SSH Error types

use thiserror::Error;

use super::host_trust::HostTrustError;
use crate::vault::VaultError;

#[derive(Error, Debug)]
pub enum SshError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SSH protocol error: {0}")]
    ProtocolError(String),

    #[error("Key error: {0}")]
    KeyError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Server key differs from the trusted fingerprint. Never retried.
    #[error(
        "HOST KEY VERIFICATION FAILED: key for {endpoint} has changed! \
         Expected: {expected}, received: {received}. \
         This could indicate a man-in-the-middle attack. \
         If the change is legitimate, forget the host and connect again"
    )]
    HostKeyMismatch {
        endpoint: String,
        expected: String,
        received: String,
    },

    #[error("Credential vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("No stored credentials for SSH authentication")]
    MissingCredentials,

    #[error("Connection cancelled")]
    Cancelled,
}

impl SshError {
    /// Errors the user must see as a security warning, not a network hiccup
    pub fn is_security_warning(&self) -> bool {
        matches!(self, SshError::HostKeyMismatch { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SshError::ConnectionFailed(_) | SshError::Timeout(_) | SshError::IoError(_)
        )
    }
}

impl From<HostTrustError> for SshError {
    fn from(err: HostTrustError) -> Self {
        match err {
            HostTrustError::HostKeyMismatch {
                endpoint,
                expected,
                received,
            } => SshError::HostKeyMismatch {
                endpoint,
                expected,
                received,
            },
            HostTrustError::Vault(e) => SshError::Vault(e),
            HostTrustError::Cancelled => SshError::Cancelled,
        }
    }
}

impl From<russh::Error> for SshError {
    fn from(err: russh::Error) -> Self {
        SshError::ProtocolError(err.to_string())
    }
}

impl From<russh::keys::Error> for SshError {
    fn from(err: russh::keys::Error) -> Self {
        SshError::KeyError(err.to_string())
    }
}

// Serialize as the display string for frontend command results
impl serde::Serialize for SshError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
