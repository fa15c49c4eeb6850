//! Private key import
//!
//! Classifies pasted private keys, repairs common copy/paste damage and
//! produces normalized text for the credential vault.

mod der;
pub mod detect;
mod error;
mod format;
pub mod unicode;

pub use detect::{analyze, detect_type, is_valid_format, normalize, KeyDetector, OPENSSH_MAGIC};
pub use error::KeyError;
pub use format::{KeyAlgorithm, KeyFormat, KeyMaterial};
