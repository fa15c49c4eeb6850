//! SSH Configuration

use serde::{Deserialize, Serialize};

use crate::config::{IdentityConfig, DEFAULT_CONNECT_TIMEOUT_SECS};

/// SSH connection target. Credentials come from the vault, not from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    /// Remote host address
    pub host: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for authentication
    pub username: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SshConfig {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Target with the configured connect timeout
    pub fn from_identity_config(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        config: &IdentityConfig,
    ) -> Self {
        Self::new(host, port, username).with_timeout(config.connect_timeout_secs)
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

fn default_port() -> u16 {
    22
}

fn default_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
