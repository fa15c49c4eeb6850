//! OxideTerm Identity - SSH credential and host trust layer
//!
//! Stores connection secrets in the system keychain, imports pasted private
//! keys (repairing common copy/paste damage), and validates server host keys
//! on a trust-on-first-use basis.

pub mod config;
pub mod keys;
pub mod ssh;
pub mod state;
pub mod vault;

pub use config::{ConfigStorage, IdentityConfig};
pub use keys::{KeyAlgorithm, KeyDetector, KeyError, KeyFormat, KeyMaterial};
pub use ssh::{HostKey, HostTrustError, HostTrustValidator, SshClient, SshError, TrustDecision};
pub use state::{IdentityError, IdentityState};
pub use vault::{CredentialVault, ScopeKey, SecretCategory, VaultError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging. `RUST_LOG` overrides the default `info` filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
