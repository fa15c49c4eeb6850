//! Configuration types

use serde::{Deserialize, Serialize};

use super::keychain::SERVICE_NAME;

/// Current config file version
pub const CONFIG_VERSION: u32 = 1;

/// OpenSSH wraps private key bodies at 70 columns
pub const DEFAULT_KEY_LINE_WIDTH: usize = 70;

/// SSH connect timeout when none is configured
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Identity layer configuration (`identity.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Config format version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Keychain service name entries are filed under
    #[serde(default = "default_service")]
    pub keychain_service: String,

    /// Trace intermediate key detection state.
    /// Only honored in debug builds.
    #[serde(default)]
    pub key_diagnostics: bool,

    /// Line width for normalized OpenSSH key bodies
    #[serde(default = "default_line_width")]
    pub key_line_width: usize,

    /// SSH connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_service() -> String {
    SERVICE_NAME.to_string()
}

fn default_line_width() -> usize {
    DEFAULT_KEY_LINE_WIDTH
}

fn default_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            keychain_service: default_service(),
            key_diagnostics: false,
            key_line_width: DEFAULT_KEY_LINE_WIDTH,
            connect_timeout_secs: default_timeout(),
        }
    }
}

impl IdentityConfig {
    /// Whether verbose key diagnostics are active for this build
    pub fn key_diagnostics_enabled(&self) -> bool {
        cfg!(debug_assertions) && self.key_diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: IdentityConfig = serde_json::from_str(r#"{"key_diagnostics": true}"#).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.keychain_service, SERVICE_NAME);
        assert_eq!(config.key_line_width, 70);
        assert!(config.key_diagnostics);
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
    }
}
