//! SSH module - host trust and connection glue
//!
//! The transport is `russh`; this module supplies what the identity layer
//! adds on top of it:
//! - TOFU host key validation backed by the credential vault
//! - A `russh` client handler wired to the validator
//! - Authentication with the vault's stored key or password

pub mod auth;
mod client;
mod config;
mod error;
pub mod host_trust;

pub use auth::{load_identity, load_identity_async, Identity};
pub use client::{ClientHandler, SshClient};
pub use config::SshConfig;
pub use error::SshError;
pub use host_trust::{HostKey, HostTrustError, HostTrustValidator, TrustDecision, TrustState};
