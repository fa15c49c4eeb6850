//! Configuration Management Module
//!
//! Handles persistent storage of the identity layer configuration and the
//! system keychain backend used by the credential vault.

pub mod keychain;
pub mod storage;
pub mod types;

pub use keychain::{KeychainBackend, SERVICE_NAME};
pub use storage::{config_dir, identity_file, parse_config, ConfigStorage, StorageError};
pub use types::{
    IdentityConfig, CONFIG_VERSION, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_KEY_LINE_WIDTH,
};
