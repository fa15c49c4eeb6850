//! Vault error types

use thiserror::Error;

/// Errors raised by the credential vault.
///
/// Every platform failure carries the backend status code so that support
/// logs can tell "keychain locked" apart from "entry too long". A
/// `WriteFailed` may follow a successful delete phase; a later read that
/// finds nothing must be treated as "never stored".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Failed to write {account} (status {status}): {message}")]
    WriteFailed {
        account: String,
        status: i32,
        message: String,
    },

    #[error("Failed to read {account} (status {status}): {message}")]
    ReadFailed {
        account: String,
        status: i32,
        message: String,
    },

    #[error("Failed to delete {account} (status {status}): {message}")]
    DeleteFailed {
        account: String,
        status: i32,
        message: String,
    },

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("Vault task failed: {0}")]
    TaskFailed(String),
}

impl VaultError {
    /// Platform status code, when the error came from the backend
    pub fn status(&self) -> Option<i32> {
        match self {
            VaultError::WriteFailed { status, .. }
            | VaultError::ReadFailed { status, .. }
            | VaultError::DeleteFailed { status, .. } => Some(*status),
            VaultError::Corrupt(_) | VaultError::TaskFailed(_) => None,
        }
    }
}
